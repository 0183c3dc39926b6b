//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Panics if a logger was already installed; use [`try_init`] from tests or
/// embedding hosts that may initialize logging themselves.
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, tolerating an already-installed logger
pub fn try_init() {
    let _ = env_logger::builder().is_test(false).try_init();
}
