use std::{
    error::Error,
    io::{self, Write},
    sync::Mutex,
};

use chrono::Utc;
use colored::Colorize;

use crate::level::LogLevel;

/// Destination for allowed log events. Implementations render and persist;
/// the core never assumes a particular transport, so console, file, buffered
/// and test-capture sinks are interchangeable.
///
/// `write` failures are absorbed by the dispatch path, never surfaced to the
/// code that logged.
pub trait Sink: Send + Sync {
    fn write(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&str>,
        error: Option<&dyn Error>,
    ) -> io::Result<()>;

    /// Flushes buffered output, if any. No-op by default.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for std::sync::Arc<S> {
    fn write(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&str>,
        error: Option<&dyn Error>,
    ) -> io::Result<()> {
        (**self).write(caller, level, message, error)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Renders an error and its source chain as one block of text.
pub(crate) fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\nCaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

fn colored_level(level: LogLevel) -> colored::ColoredString {
    match level {
        LogLevel::Error => "ERROR".red(),
        LogLevel::Warn => "WARN".yellow(),
        LogLevel::Info => "INFO".green(),
        LogLevel::Debug => "DEBUG".blue(),
        LogLevel::Trace => "TRACE".purple(),
        LogLevel::Off => "OFF".normal(),
    }
}

/// Annotated console sink: `[timestamp] [LEVEL] [caller] message` lines,
/// WARN and ERROR to stderr, everything else to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    fn format_line(caller: &str, level: LogLevel, message: &str) -> String {
        let time = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f");
        format!("[{time}] [{}] [{caller}] {message}", colored_level(level))
    }
}

impl Sink for ConsoleSink {
    fn write(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&str>,
        error: Option<&dyn Error>,
    ) -> io::Result<()> {
        let line = Self::format_line(caller, level, message.unwrap_or_default());
        if level >= LogLevel::Warn {
            let stderr = io::stderr();
            let mut handle = stderr.lock();
            writeln!(handle, "{line}")?;
            if let Some(error) = error {
                writeln!(handle, "{}", error_chain(error))?;
            }
            handle.flush()
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{line}")?;
            if let Some(error) = error {
                writeln!(handle, "{}", error_chain(error))?;
            }
            handle.flush()
        }
    }
}

/// Minimal last-resort sink used when the active sink fails: bare lines on
/// stderr, no annotations, no color.
#[derive(Debug, Default)]
pub struct FallbackSink;

impl Sink for FallbackSink {
    fn write(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&str>,
        error: Option<&dyn Error>,
    ) -> io::Result<()> {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        if let Some(message) = message {
            writeln!(handle, "{level} {caller}: {message}")?;
        }
        if let Some(error) = error {
            writeln!(handle, "{level} {caller}: {}", error_chain(error))?;
        }
        handle.flush()
    }
}

/// One event recorded by a [`CaptureSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub caller: String,
    pub level: LogLevel,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// In-memory sink that records events instead of writing them, for tests
/// and for asserting on logging behavior in consumer code.
#[derive(Debug, Default)]
pub struct CaptureSink {
    events: Mutex<Vec<CapturedEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn take_events(&self) -> Vec<CapturedEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

impl Sink for CaptureSink {
    fn write(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&str>,
        error: Option<&dyn Error>,
    ) -> io::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(CapturedEvent {
                caller: caller.to_string(),
                level,
                message: message.map(String::from),
                error: error.map(error_chain),
            });
        Ok(())
    }
}
