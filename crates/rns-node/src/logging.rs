//! Tracing subscriber setup.
//!
//! Level conventions:
//! - ERROR: unrecoverable failures
//! - WARN: recoverable errors, unexpected but handled conditions
//! - INFO: high-level protocol events (link established, path learned)
//! - DEBUG: protocol state changes
//! - TRACE: wire-level detail

use tracing_subscriber::EnvFilter;

/// Initialize with plain formatting. `RUST_LOG` overrides the default
/// level from the config.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize with JSON output for structured collection.
pub fn init_json(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
}

/// Initialize for tests; safe to call repeatedly.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
