//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Panics if a logger has already been installed; embedders that may call
/// this more than once should use [`try_init`].
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system unless a logger is already installed
///
/// Returns `true` when this call installed the logger.
pub fn try_init() -> bool {
    env_logger::try_init().is_ok()
}

/// Route log output through the test harness capture
#[cfg(test)]
pub(crate) fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
