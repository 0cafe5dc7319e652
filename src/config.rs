use std::{sync::LazyLock, time::Duration};

use derive_from_env::FromEnv;

use crate::level::LogLevel;

const DEFAULT_FLUSH_INTERVAL_MS: u64 = 100;

/// Environment-driven settings. Values are kept as raw strings and parsed at
/// the accessors: a malformed variable falls back to its default instead of
/// crashing the host.
#[derive(FromEnv)]
#[from_env(prefix = "PKGLOG")]
#[allow(non_snake_case)]
pub struct PkglogConfig {
    /// Flush interval for buffered sinks, in milliseconds.
    #[from_env(default = "100")]
    pub FLUSH_INTERVAL_MS: String,
    /// Process-wide default level applied where no package override matches.
    #[from_env(default = "info")]
    pub DEFAULT_LEVEL: String,
}

impl PkglogConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(
            self.FLUSH_INTERVAL_MS
                .parse()
                .unwrap_or(DEFAULT_FLUSH_INTERVAL_MS),
        )
    }

    pub fn default_level(&self) -> LogLevel {
        self.DEFAULT_LEVEL.parse().unwrap_or(LogLevel::Info)
    }
}

pub static PKGLOG_CONFIG: LazyLock<PkglogConfig> =
    LazyLock::new(|| PkglogConfig::from_env().unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = PkglogConfig {
            FLUSH_INTERVAL_MS: "soon".to_string(),
            DEFAULT_LEVEL: "loud".to_string(),
        };
        assert_eq!(config.flush_interval(), Duration::from_millis(100));
        assert_eq!(config.default_level(), LogLevel::Info);
    }

    #[test]
    fn well_formed_values_are_used() {
        let config = PkglogConfig {
            FLUSH_INTERVAL_MS: "250".to_string(),
            DEFAULT_LEVEL: "warn".to_string(),
        };
        assert_eq!(config.flush_interval(), Duration::from_millis(250));
        assert_eq!(config.default_level(), LogLevel::Warn);
    }
}
