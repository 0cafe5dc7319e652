//! Exercises the global `log`-crate adapter. Kept in its own test binary:
//! these tests configure process-wide state.

use std::sync::Arc;

use pkglog::{CaptureSink, LogLevel, logger};

#[test]
fn log_macros_route_through_the_package_tree() {
    pkglog::init().unwrap();
    let sink = Arc::new(CaptureSink::new());
    logger().set_sink(sink.clone());
    logger().set_default_level(LogLevel::Warn);
    logger().set_level("com.acme.billing", LogLevel::Debug);

    log::debug!(target: "com.acme.billing", "posting invoice");
    log::debug!(target: "com.acme.shipping", "printing label");
    log::error!(target: "com.acme.shipping", "label printer on fire");
    log::info!("module-path caller below the default level");

    let events = sink.take_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].caller, "com.acme.billing");
    assert_eq!(events[0].level, LogLevel::Debug);
    assert_eq!(events[0].message.as_deref(), Some("posting invoice"));
    assert_eq!(events[1].caller, "com.acme.shipping");
    assert_eq!(events[1].level, LogLevel::Error);

    // The adapter's enabled() consults the tree as well.
    assert!(log::log_enabled!(target: "com.acme.billing", log::Level::Debug));
    assert!(!log::log_enabled!(target: "com.acme.shipping", log::Level::Info));

    logger().clear_levels();
    logger().flush();
}
