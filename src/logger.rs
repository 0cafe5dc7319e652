use std::{
    error::Error,
    fmt,
    sync::{
        Arc, LazyLock, PoisonError, RwLock,
        atomic::{AtomicU8, Ordering},
    },
};

use crate::{
    config::PKGLOG_CONFIG,
    dispatch::{self, should_emit},
    level::LogLevel,
    package_tree::PackageTree,
    resolve::{resolve, segments},
    sink::{ConsoleSink, Sink},
};

/// Sentinel caller identity used when a call site supplies none.
const FALLBACK_CALLER: &str = "pkglog";

macro_rules! per_level_methods {
    ($($name:ident, $name_with:ident => $level:ident),* $(,)?) => {
        $(
            #[doc = concat!("Emits a ", stringify!($level), "-level message for `caller`.")]
            pub fn $name(&self, caller: &str, message: impl fmt::Display) {
                self.emit(caller, LogLevel::$level, Some(&message as &dyn fmt::Display), None);
            }

            #[doc = concat!("Emits a ", stringify!($level), "-level message with an associated error.")]
            pub fn $name_with(&self, caller: &str, message: impl fmt::Display, error: &dyn Error) {
                self.emit(caller, LogLevel::$level, Some(&message as &dyn fmt::Display), Some(error));
            }
        )*
    };
}

macro_rules! per_level_handle_methods {
    ($($name:ident, $name_with:ident => $level:ident),* $(,)?) => {
        $(
            pub fn $name(&self, message: impl fmt::Display) {
                self.logger.$name(&self.caller, message);
            }

            pub fn $name_with(&self, message: impl fmt::Display, error: &dyn Error) {
                self.logger.$name_with(&self.caller, message, error);
            }
        )*
    };
}

/// The process-wide logging state: the package-level tree behind a
/// reader/writer lock, the default level, and the active sink.
///
/// Reads (every log call) take the tree lock shared and only for the
/// traversal; writes (configuration calls) take it exclusively and only for
/// the mutation. The sink is never invoked under either lock.
pub struct Logger {
    tree: RwLock<PackageTree>,
    default_level: AtomicU8,
    sink: RwLock<Arc<dyn Sink>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a logger with an empty tree, the annotated console sink, and
    /// the default level taken from `PKGLOG_DEFAULT_LEVEL` (falling back to
    /// `Info` when unset or unparseable; a bad variable must not crash the
    /// host).
    pub fn new() -> Self {
        let default_level = PKGLOG_CONFIG.default_level();
        Self {
            tree: RwLock::new(PackageTree::new()),
            default_level: AtomicU8::new(default_level.as_u8()),
            sink: RwLock::new(Arc::new(ConsoleSink)),
        }
    }

    /// Sets the level for a dotted package name (or `::`-separated module
    /// path), creating the chain as needed. Overwrites any level previously
    /// configured for exactly that name.
    pub fn set_level(&self, name: &str, level: LogLevel) {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.set_level(segments(name), level);
    }

    /// Merges an independently-built level tree into the live one. Levels
    /// already configured here win over incoming ones.
    pub fn merge_levels(&self, source: PackageTree) {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.merge(source);
    }

    /// Drops every configured override; every name then resolves to the
    /// default level.
    pub fn clear_levels(&self) {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.clear();
    }

    pub fn set_default_level(&self, level: LogLevel) {
        self.default_level.store(level.as_u8(), Ordering::Release);
    }

    pub fn default_level(&self) -> LogLevel {
        LogLevel::from_u8(self.default_level.load(Ordering::Acquire))
    }

    /// The level actually gating events from `name`: the configured override
    /// resolved through the tree, or the process default when nothing
    /// matches.
    pub fn effective_level(&self, name: &str) -> LogLevel {
        let resolved = {
            let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
            resolve(&tree, name)
        };
        resolved.unwrap_or_else(|| self.default_level())
    }

    /// Whether an event at `level` from `name` would be emitted. Callers can
    /// use this to skip building expensive messages.
    pub fn is_enabled(&self, name: &str, level: LogLevel) -> bool {
        should_emit(level, self.effective_level(name))
    }

    /// Replaces the active sink. The swap is atomic: in-flight events finish
    /// against the sink they already resolved, later events see the new one.
    pub fn set_sink(&self, sink: Arc<dyn Sink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    pub fn sink(&self) -> Arc<dyn Sink> {
        Arc::clone(&self.sink.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Flushes the active sink. No-op for unbuffered sinks; failures are
    /// absorbed.
    pub fn flush(&self) {
        let _ = self.sink().flush();
    }

    /// Gates and emits one event. The message is rendered only after the
    /// gate allows it, and the sink runs outside the tree lock.
    fn emit(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&dyn fmt::Display>,
        error: Option<&dyn Error>,
    ) {
        if !should_emit(level, self.effective_level(caller)) {
            return;
        }
        let message = message.map(ToString::to_string);
        let sink = self.sink();
        dispatch::emit(&*sink, caller, level, message.as_deref(), error);
    }

    /// Emits an event with explicit parts; the per-level methods cover the
    /// common shapes.
    pub fn log(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&str>,
        error: Option<&dyn Error>,
    ) {
        self.emit(caller, level, message.as_ref().map(|m| m as &dyn fmt::Display), error);
    }

    per_level_methods! {
        trace, trace_with => Trace,
        debug, debug_with => Debug,
        info, info_with => Info,
        warn, warn_with => Warn,
        error, error_with => Error,
    }

    /// A handle bound to one caller name, for components that log often and
    /// do not want to repeat their identity at every call.
    pub fn handle(&self, caller: impl Into<String>) -> Handle<'_> {
        Handle {
            logger: self,
            caller: caller.into(),
        }
    }
}

/// Per-caller logging handle; see [`Logger::handle`].
pub struct Handle<'a> {
    logger: &'a Logger,
    caller: String,
}

impl Handle<'_> {
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.logger.is_enabled(&self.caller, level)
    }

    per_level_handle_methods! {
        trace, trace_with => Trace,
        debug, debug_with => Debug,
        info, info_with => Info,
        warn, warn_with => Warn,
        error, error_with => Error,
    }
}

static GLOBAL_LOGGER: LazyLock<Logger> = LazyLock::new(Logger::new);

/// The process-wide logger handle.
pub fn logger() -> &'static Logger {
    &GLOBAL_LOGGER
}

/// Adapter routing the `log` crate's macros through the package tree. The
/// record's target (defaulting to its module path) supplies the caller
/// identity.
struct PkgLogger;

static PKG_LOGGER: PkgLogger = PkgLogger;

fn record_caller<'a>(target: &'a str, module_path: Option<&'a str>) -> &'a str {
    if !target.is_empty() {
        target
    } else {
        module_path.unwrap_or(FALLBACK_CALLER)
    }
}

impl log::Log for PkgLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        logger().is_enabled(metadata.target(), LogLevel::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let logger = logger();
        let caller = record_caller(record.target(), record.module_path());
        let level = LogLevel::from(record.level());
        if !logger.is_enabled(caller, level) {
            return;
        }
        let message = record.args().to_string();
        let sink = logger.sink();
        dispatch::emit(&*sink, caller, level, Some(&message), None);
    }

    fn flush(&self) {
        logger().flush();
    }
}

/// Installs the global logger behind the `log` crate's macros. The maximum
/// level filter is opened up to `Trace` so the tree, not the `log` crate's
/// static filter, makes the per-call decision.
pub fn init() -> Result<(), log::SetLoggerError> {
    log::set_logger(&PKG_LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CaptureSink;

    fn capture_logger() -> (Logger, Arc<CaptureSink>) {
        let logger = Logger::new();
        let sink = Arc::new(CaptureSink::new());
        logger.set_sink(sink.clone());
        (logger, sink)
    }

    #[test]
    fn set_level_takes_effect_immediately() {
        let (logger, _) = capture_logger();
        logger.set_level("com.acme.billing", LogLevel::Debug);
        assert_eq!(logger.effective_level("com.acme.billing"), LogLevel::Debug);
    }

    #[test]
    fn unconfigured_names_get_the_default_level() {
        let (logger, _) = capture_logger();
        logger.set_default_level(LogLevel::Warn);
        assert_eq!(logger.effective_level("org.example"), LogLevel::Warn);
        assert!(logger.is_enabled("org.example", LogLevel::Error));
        assert!(!logger.is_enabled("org.example", LogLevel::Info));
    }

    #[test]
    fn clear_levels_restores_the_default_everywhere() {
        let (logger, _) = capture_logger();
        logger.set_default_level(LogLevel::Info);
        logger.set_level("com.acme", LogLevel::Trace);
        logger.set_level("com.acme.billing", LogLevel::Error);
        logger.clear_levels();

        assert_eq!(logger.effective_level("com.acme"), LogLevel::Info);
        assert_eq!(logger.effective_level("com.acme.billing"), LogLevel::Info);
    }

    #[test]
    fn off_silences_a_subtree() {
        let (logger, sink) = capture_logger();
        logger.set_level("com.acme", LogLevel::Off);
        logger.error("com.acme.billing", "unseen");
        assert!(sink.events().is_empty());
    }

    #[test]
    fn events_below_the_effective_level_are_dropped() {
        let (logger, sink) = capture_logger();
        logger.set_default_level(LogLevel::Warn);

        logger.debug("org.example", "dropped");
        logger.info("org.example", "dropped");
        logger.warn("org.example", "kept");
        logger.error("org.example", "kept");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, LogLevel::Warn);
        assert_eq!(events[1].level, LogLevel::Error);
    }

    #[test]
    fn errors_are_forwarded_with_their_chain() {
        let (logger, sink) = capture_logger();
        let cause = std::io::Error::other("disk gone");
        logger.error_with("org.example", "write failed", &cause);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message.as_deref(), Some("write failed"));
        assert_eq!(events[0].error.as_deref(), Some("disk gone"));
    }

    #[test]
    fn merge_levels_keeps_existing_configuration() {
        let (logger, _) = capture_logger();
        logger.set_level("com.acme", LogLevel::Warn);
        logger.merge_levels(PackageTree::from_path(["com", "acme"], LogLevel::Trace));
        logger.merge_levels(PackageTree::from_path(["com", "acme", "billing"], LogLevel::Debug));

        assert_eq!(logger.effective_level("com.acme"), LogLevel::Warn);
        assert_eq!(logger.effective_level("com.acme.billing"), LogLevel::Debug);
    }

    #[test]
    fn handle_logs_under_its_bound_caller() {
        let (logger, sink) = capture_logger();
        logger.set_level("com.acme.billing", LogLevel::Debug);
        let handle = logger.handle("com.acme.billing");

        assert!(handle.is_enabled(LogLevel::Debug));
        handle.debug("posting invoice");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].caller, "com.acme.billing");
        assert_eq!(events[0].level, LogLevel::Debug);
    }

    #[test]
    fn record_caller_falls_back_to_the_crate_name() {
        assert_eq!(record_caller("com.acme", Some("app::module")), "com.acme");
        assert_eq!(record_caller("", Some("app::module")), "app::module");
        assert_eq!(record_caller("", None), FALLBACK_CALLER);
    }
}
