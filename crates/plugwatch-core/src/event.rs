//! Monitor events and actions.

use std::fmt;

use crate::device::DeviceIds;

/// Raw notification pushed by a backend's hotplug callback.
///
/// Callbacks only record what happened. Descriptor lookup and device opening
/// happen later, outside the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugNotice<D> {
    /// A matching device arrived.
    Arrived(D),
    /// A matching device left.
    Left(D),
}

/// Events fed into the [`Monitor`](crate::Monitor).
///
/// `D` is the backend's device type, `H` its open-handle type.
#[derive(Debug)]
pub enum MonitorEvent<D, H> {
    /// A device arrived. `ids` holds the descriptor or the reason it could
    /// not be read.
    DeviceArrived {
        /// The arrived device (used to open it).
        device: D,
        /// Descriptor IDs or lookup failure.
        ids: Result<DeviceIds, String>,
    },

    /// A device left.
    DeviceLeft {
        /// Descriptor IDs or lookup failure.
        ids: Result<DeviceIds, String>,
    },

    /// An `Open` action succeeded.
    DeviceOpened {
        /// The new handle; ownership passes to the monitor.
        handle: H,
    },

    /// An `Open` action failed.
    OpenFailed {
        /// Description of the failure.
        reason: String,
    },

    /// A round of event handling failed.
    EventsFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The loop is ending; release everything.
    Shutdown,
}

/// Actions returned by the [`Monitor`](crate::Monitor) for the driver to
/// execute.
#[derive(Debug)]
pub enum MonitorAction<D, H> {
    /// Emit a user-facing report line.
    Report(Report),

    /// Open the device and feed the result back as
    /// [`MonitorEvent::DeviceOpened`] or [`MonitorEvent::OpenFailed`].
    Open {
        /// Device to open.
        device: D,
    },

    /// Close a handle. Ownership passes back to the driver.
    Close {
        /// Handle to close.
        handle: H,
        /// Why the handle is being closed.
        reason: CloseReason,
    },

    /// Log a diagnostic message.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message text.
        message: String,
    },
}

/// User-facing report lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// A device arrived. `None` if its descriptor was unreadable.
    Attached(Option<DeviceIds>),
    /// A device left. `None` if its descriptor was unreadable.
    Detached(Option<DeviceIds>),
    /// A handle was still open when the loop ended.
    LeftoverHandle,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attached(Some(ids)) => write!(f, "Device attached: {ids}"),
            Self::Attached(None) => f.write_str("Device attached"),
            Self::Detached(Some(ids)) => write!(f, "Device detached: {ids}"),
            Self::Detached(None) => f.write_str("Device detached"),
            Self::LeftoverHandle => f.write_str("Warning: Closing left-over open handle"),
        }
    }
}

/// Why a handle is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A newer device was opened into the single handle slot.
    Replaced,
    /// A device left.
    DeviceLeft,
    /// The monitor is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Replaced => "replaced by newer device",
            Self::DeviceLeft => "device left",
            Self::Shutdown => "shutdown",
        })
    }
}

/// Log severity for [`MonitorAction::Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug detail.
    Debug,
    /// Informational.
    Info,
    /// Something unexpected but harmless.
    Warn,
    /// A failure.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lines() {
        let ids = DeviceIds::new(0x046d, 0xc52b, 0);

        assert_eq!(Report::Attached(Some(ids)).to_string(), "Device attached: 046d:c52b");
        assert_eq!(Report::Attached(None).to_string(), "Device attached");
        assert_eq!(Report::Detached(Some(ids)).to_string(), "Device detached: 046d:c52b");
        assert_eq!(Report::Detached(None).to_string(), "Device detached");
        assert_eq!(Report::LeftoverHandle.to_string(), "Warning: Closing left-over open handle");
    }
}
