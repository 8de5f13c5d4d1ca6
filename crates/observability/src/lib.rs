//! Logging setup shared by hosts and test suites.

/// Initialize process-wide logging from the environment.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, LogFormatError, ObservabilityConfig, init_with};
