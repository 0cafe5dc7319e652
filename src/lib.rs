//! # pkglog
//! Hierarchical package-level logging facade with runtime-configurable log levels.
//!
//! Independently-authored components emit leveled events; one mutable tree of
//! dotted-name segments decides per call whether an event is written. Levels
//! configured for a package apply to everything beneath it unless a more
//! specific descendant overrides them, and configuration can change at any
//! time while other threads are logging.
//!
//! ## Usage
//! ```rust
//! use pkglog::{LogLevel, logger};
//!
//! pkglog::init().unwrap();
//!
//! let logger = logger();
//! logger.set_default_level(LogLevel::Warn);
//! logger.set_level("com.acme.billing", LogLevel::Debug);
//!
//! // Routed through the `log` macros; the target is the caller identity.
//! log::debug!(target: "com.acme.billing", "posting invoice");   // emitted
//! log::debug!(target: "com.acme.shipping", "printing label");   // dropped
//! ```
//!
//! ## Direct API with errors
//! Events can carry an error whose source chain is written after the message:
//! ```rust
//! use pkglog::{LogLevel, Logger};
//!
//! let logger = Logger::new();
//! let error = std::io::Error::other("disk gone");
//! logger.error_with("com.acme.storage", "write failed", &error);
//!
//! // Or bind the caller name once:
//! let handle = logger.handle("com.acme.storage");
//! if handle.is_enabled(LogLevel::Debug) {
//!     handle.debug("retrying write");
//! }
//! ```
//!
//! ## Buffered output
//! Sinks are swappable at runtime; the buffered sink moves I/O onto a writer
//! thread and flushes on an interval (`PKGLOG_FLUSH_INTERVAL_MS`):
//! ```rust
//! use std::sync::Arc;
//! use pkglog::{BufferedSink, ConsoleSink, LoggerGuard, logger};
//!
//! let sink: Arc<dyn pkglog::Sink> = Arc::new(BufferedSink::spawn(ConsoleSink));
//! logger().set_sink(Arc::clone(&sink));
//! let _guard = LoggerGuard::new(sink);
//! log::info!("hello");
//! // guard flushes pending records when dropped
//! ```

mod buffered;
mod config;
mod dispatch;
mod level;
mod logger;
mod package_tree;
mod resolve;
mod sink;

pub use buffered::{BufferedSink, LoggerGuard};
pub use dispatch::should_emit;
pub use level::{LogLevel, ParseLogLevelError};
pub use logger::{Handle, Logger, init, logger};
pub use package_tree::PackageTree;
pub use resolve::resolve;
pub use sink::{CaptureSink, CapturedEvent, ConsoleSink, FallbackSink, Sink};
