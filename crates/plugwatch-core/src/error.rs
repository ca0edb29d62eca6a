//! Error types.

use thiserror::Error;

/// Errors reported by a [`UsbBackend`](crate::UsbBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The platform or library build cannot deliver hotplug events.
    #[error("hotplug capabilities are not supported on this platform")]
    HotplugUnsupported,

    /// The USB library could not be initialised.
    #[error("failed to initialise USB library: {reason}")]
    Init {
        /// Description of the failure.
        reason: String,
    },

    /// Registering the hotplug callbacks failed.
    #[error("error registering hotplug callback: {reason}")]
    Registration {
        /// Description of the failure.
        reason: String,
    },

    /// A single round of event handling failed.
    #[error("event handling failed: {reason}")]
    Events {
        /// Description of the failure.
        reason: String,
    },

    /// The device descriptor could not be read.
    #[error("error getting device descriptor: {reason}")]
    Descriptor {
        /// Description of the failure.
        reason: String,
    },

    /// The device could not be opened.
    #[error("no access to device: {reason}")]
    Access {
        /// Description of the failure.
        reason: String,
    },
}

impl BackendError {
    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Fatal errors happen while setting up and end the program.
    /// Transient errors concern a single event and are only logged.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::HotplugUnsupported | Self::Init { .. } | Self::Registration { .. } => true,

            Self::Events { .. } | Self::Descriptor { .. } | Self::Access { .. } => false,
        }
    }

    /// The bare failure description, without the error category prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::HotplugUnsupported => "hotplug unsupported",
            Self::Init { reason }
            | Self::Registration { reason }
            | Self::Events { reason }
            | Self::Descriptor { reason }
            | Self::Access { reason } => reason,
        }
    }
}

/// Errors from parsing match filter arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The argument was empty.
    #[error("empty {field} argument")]
    Empty {
        /// Which filter field was being parsed.
        field: &'static str,
    },

    /// The argument is not a number in any accepted base.
    #[error("invalid {field} '{input}': expected decimal, 0x-prefixed hex or 0-prefixed octal")]
    Malformed {
        /// Which filter field was being parsed.
        field: &'static str,
        /// The rejected input.
        input: String,
    },

    /// The number does not fit in the field.
    #[error("{field} {value} out of range (max {max:#x})")]
    OutOfRange {
        /// Which filter field was being parsed.
        field: &'static str,
        /// The parsed value.
        value: i64,
        /// Largest accepted value.
        max: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_are_fatal() {
        assert!(BackendError::HotplugUnsupported.is_fatal());
        assert!(BackendError::Init { reason: "no backend".to_string() }.is_fatal());
        assert!(BackendError::Registration { reason: "busy".to_string() }.is_fatal());
    }

    #[test]
    fn per_event_errors_are_transient() {
        assert!(!BackendError::Events { reason: "interrupted".to_string() }.is_fatal());
        assert!(!BackendError::Descriptor { reason: "io".to_string() }.is_fatal());
        assert!(!BackendError::Access { reason: "denied".to_string() }.is_fatal());
    }

    #[test]
    fn reason_strips_prefix() {
        let err = BackendError::Access { reason: "Access denied (insufficient permissions)".into() };
        assert_eq!(err.reason(), "Access denied (insufficient permissions)");
        assert_eq!(err.to_string(), "no access to device: Access denied (insufficient permissions)");
    }

    #[test]
    fn filter_error_display() {
        let err = FilterError::OutOfRange { field: "class", value: 256, max: 0xff };
        assert_eq!(err.to_string(), "class 256 out of range (max 0xff)");
    }
}
