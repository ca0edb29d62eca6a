//! Hotplug monitor state machine.
//!
//! ## Responsibilities
//!
//! - Counting: Arrivals and removals seen since start
//! - Handle slot: At most one open device handle, replaced by newer arrivals
//!   and released on any removal
//! - Termination: Done once removals have caught up with a non-zero number
//!   of arrivals
//!
//! ## Design
//!
//! - Action-based: All methods return actions, no direct I/O
//! - Ownership: Handles move into the monitor with `DeviceOpened` and back
//!   out with `Close`, so a handle can never be closed twice

use std::marker::PhantomData;

use crate::{
    device::DeviceIds,
    event::{CloseReason, LogLevel, MonitorAction, MonitorEvent, Report},
};

/// Snapshot of the monitor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Devices that arrived (including ones that could not be opened).
    pub attached: u64,
    /// Devices that left (including ones present before start).
    pub detached: u64,
    /// Whether a handle is currently held.
    pub handle_open: bool,
}

/// Hotplug monitor.
///
/// Pure state machine - returns actions, caller handles I/O.
///
/// # Type Parameters
///
/// - `D`: Backend device type
/// - `H`: Backend open-handle type
///
/// # Invariants
///
/// - At most one handle is held at any time
/// - Counters never decrease
/// - Once shut down, further events produce no actions
pub struct Monitor<D, H> {
    /// Arrival count.
    attached: u64,

    /// Removal count.
    detached: u64,

    /// The single open handle, if any.
    handle: Option<H>,

    /// Set after `Shutdown`.
    shut_down: bool,

    _device: PhantomData<fn() -> D>,
}

impl<D, H> Default for Monitor<D, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, H> Monitor<D, H> {
    /// Create a monitor with zeroed counters and no handle.
    pub fn new() -> Self {
        Self { attached: 0, detached: 0, handle: None, shut_down: false, _device: PhantomData }
    }

    /// Number of arrivals seen.
    pub fn attached(&self) -> u64 {
        self.attached
    }

    /// Number of removals seen.
    pub fn detached(&self) -> u64 {
        self.detached
    }

    /// Whether a device handle is currently held.
    pub fn has_open_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether `Shutdown` has been processed.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Counter snapshot.
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            attached: self.attached,
            detached: self.detached,
            handle_open: self.handle.is_some(),
        }
    }

    /// Whether the observation loop should end.
    ///
    /// True once at least one device arrived and at least as many devices
    /// left. Removals seen before the first arrival keep the loop running.
    pub fn is_done(&self) -> bool {
        self.attached > 0 && self.detached >= self.attached
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: MonitorEvent<D, H>) -> Vec<MonitorAction<D, H>> {
        if self.shut_down {
            let log = MonitorAction::Log {
                level: LogLevel::Debug,
                message: format!("ignoring {} after shutdown", event_name(&event)),
            };
            // A late handle must still go back to the driver to be closed
            return match event {
                MonitorEvent::DeviceOpened { handle } => {
                    vec![log, MonitorAction::Close { handle, reason: CloseReason::Shutdown }]
                },
                _ => vec![log],
            };
        }

        match event {
            MonitorEvent::DeviceArrived { device, ids } => self.handle_arrived(device, ids),
            MonitorEvent::DeviceLeft { ids } => self.handle_left(ids),
            MonitorEvent::DeviceOpened { handle } => self.handle_opened(handle),
            MonitorEvent::OpenFailed { reason } => vec![MonitorAction::Log {
                level: LogLevel::Error,
                message: format!("No access to device: {reason}"),
            }],
            MonitorEvent::EventsFailed { reason } => vec![MonitorAction::Log {
                level: LogLevel::Error,
                message: format!("event handling failed: {reason}"),
            }],
            MonitorEvent::Shutdown => self.handle_shutdown(),
        }
    }

    /// Handle device arrival: report, then ask the driver to open it.
    fn handle_arrived(
        &mut self,
        device: D,
        ids: Result<DeviceIds, String>,
    ) -> Vec<MonitorAction<D, H>> {
        let mut actions = Vec::with_capacity(3);
        push_report(&mut actions, Report::Attached, ids);
        actions.push(MonitorAction::Open { device });

        self.attached += 1;
        actions
    }

    /// Handle device removal: report and release whatever handle is held.
    fn handle_left(&mut self, ids: Result<DeviceIds, String>) -> Vec<MonitorAction<D, H>> {
        let mut actions = Vec::with_capacity(3);
        push_report(&mut actions, Report::Detached, ids);

        if let Some(handle) = self.handle.take() {
            actions.push(MonitorAction::Close { handle, reason: CloseReason::DeviceLeft });
        }

        self.detached += 1;
        actions
    }

    /// Store a freshly opened handle, closing the previous one.
    fn handle_opened(&mut self, handle: H) -> Vec<MonitorAction<D, H>> {
        match self.handle.replace(handle) {
            Some(old) => vec![MonitorAction::Close { handle: old, reason: CloseReason::Replaced }],
            None => Vec::new(),
        }
    }

    fn handle_shutdown(&mut self) -> Vec<MonitorAction<D, H>> {
        self.shut_down = true;

        match self.handle.take() {
            Some(handle) => vec![
                MonitorAction::Report(Report::LeftoverHandle),
                MonitorAction::Close { handle, reason: CloseReason::Shutdown },
            ],
            None => Vec::new(),
        }
    }
}

/// Push the report line, plus an error log when the descriptor was unreadable.
fn push_report<D, H>(
    actions: &mut Vec<MonitorAction<D, H>>,
    report: fn(Option<DeviceIds>) -> Report,
    ids: Result<DeviceIds, String>,
) {
    match ids {
        Ok(ids) => actions.push(MonitorAction::Report(report(Some(ids)))),
        Err(reason) => {
            actions.push(MonitorAction::Report(report(None)));
            actions.push(MonitorAction::Log {
                level: LogLevel::Error,
                message: format!("Error getting device descriptor: {reason}"),
            });
        },
    }
}

fn event_name<D, H>(event: &MonitorEvent<D, H>) -> &'static str {
    match event {
        MonitorEvent::DeviceArrived { .. } => "DeviceArrived",
        MonitorEvent::DeviceLeft { .. } => "DeviceLeft",
        MonitorEvent::DeviceOpened { .. } => "DeviceOpened",
        MonitorEvent::OpenFailed { .. } => "OpenFailed",
        MonitorEvent::EventsFailed { .. } => "EventsFailed",
        MonitorEvent::Shutdown => "Shutdown",
    }
}
