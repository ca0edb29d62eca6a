//! Driver error types.

use plugwatch_core::{BackendError, FilterError};
use thiserror::Error;

/// Errors that end the monitor loop.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Setting up the USB backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Invalid match filter.
    #[error("configuration error: {0}")]
    Config(#[from] FilterError),

    /// The run already ended; the monitor ignores any further events.
    #[error("monitor already shut down")]
    Finished,

    /// `poll_once` was called before `start`.
    #[error("hotplug callbacks are not registered")]
    NotStarted,

    /// Writing a report line failed.
    #[error("report output error: {0}")]
    Report(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_display_unchanged() {
        let err = DriverError::from(BackendError::HotplugUnsupported);
        assert_eq!(err.to_string(), "hotplug capabilities are not supported on this platform");
    }

    #[test]
    fn config_error_display() {
        let err = DriverError::from(FilterError::Empty { field: "class" });
        assert_eq!(err.to_string(), "configuration error: empty class argument");
    }

    #[test]
    fn config_error_shows_rejected_input() {
        let err = DriverError::from(FilterError::OutOfRange {
            field: "vendor ID",
            value: 0x10000,
            max: 0xffff,
        });
        assert_eq!(err.to_string(), "configuration error: vendor ID 65536 out of range (max 0xffff)");
    }
}
