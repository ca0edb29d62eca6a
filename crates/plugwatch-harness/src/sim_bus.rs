//! Scripted USB bus.
//!
//! `SimBus` implements [`UsbBackend`] without hardware. A script of rounds
//! is replayed, one round per `handle_events` call, and every handle opened
//! or closed is recorded for oracles to inspect.
//!
//! # Invariants
//!
//! - Callbacks only fire for devices matching the registered filter
//! - With `enumerate`, devices connected before registration are notified
//!   during `register`, as libusb does
//! - Once the script is exhausted, the exhaustion flag is raised so a driver
//!   using it as stop flag terminates

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use plugwatch_core::{BackendError, DeviceIds, EventSink, MatchFilter, UsbBackend};

/// Simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimDevice {
    /// Bus-unique identifier.
    pub id: u32,
    /// Descriptor fields.
    pub ids: DeviceIds,
    /// Whether the descriptor can be read.
    pub readable: bool,
    /// Whether opening is permitted.
    pub accessible: bool,
}

impl SimDevice {
    /// A readable, accessible device.
    pub fn new(id: u32, vendor_id: u16, product_id: u16) -> Self {
        Self { id, ids: DeviceIds::new(vendor_id, product_id, 0), readable: true, accessible: true }
    }

    /// Set the device class.
    #[must_use]
    pub fn with_class(mut self, class_code: u8) -> Self {
        self.ids.class_code = class_code;
        self
    }

    /// Make the descriptor unreadable.
    #[must_use]
    pub fn unreadable(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Deny opening.
    #[must_use]
    pub fn denied(mut self) -> Self {
        self.accessible = false;
        self
    }
}

/// A single scripted happening on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusStep {
    /// Plug a device in.
    Attach(SimDevice),
    /// Unplug the device with this id.
    Detach(u32),
    /// Make this round's `handle_events` fail.
    Fail(String),
}

/// Open handle on the simulated bus.
///
/// Deliberately not `Clone`: a handle can only be closed once.
#[derive(Debug, PartialEq, Eq)]
pub struct SimHandle {
    /// Handle serial number.
    pub serial: u64,
    /// Device the handle belongs to.
    pub device_id: u32,
}

/// Record of a handle's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleRecord {
    /// Handle serial number.
    pub serial: u64,
    /// Device the handle belongs to.
    pub device_id: u32,
    /// Whether the handle has been closed.
    pub closed: bool,
}

/// Scripted [`UsbBackend`].
#[derive(Debug)]
pub struct SimBus {
    hotplug_supported: bool,
    registration_error: Option<String>,
    rounds: VecDeque<Vec<BusStep>>,
    connected: BTreeMap<u32, SimDevice>,
    filter: MatchFilter,
    sink: Option<EventSink<SimDevice>>,
    handles: Vec<HandleRecord>,
    double_closes: usize,
    polls: u64,
    last_timeout: Option<Duration>,
    exhausted: Arc<AtomicBool>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// Empty bus with hotplug support.
    pub fn new() -> Self {
        Self {
            hotplug_supported: true,
            registration_error: None,
            rounds: VecDeque::new(),
            connected: BTreeMap::new(),
            filter: MatchFilter::any(),
            sink: None,
            handles: Vec::new(),
            double_closes: 0,
            polls: 0,
            last_timeout: None,
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Pretend the platform has no hotplug support.
    #[must_use]
    pub fn without_hotplug(mut self) -> Self {
        self.hotplug_supported = false;
        self
    }

    /// Make callback registration fail.
    #[must_use]
    pub fn refusing_registration(mut self, reason: impl Into<String>) -> Self {
        self.registration_error = Some(reason.into());
        self
    }

    /// Connect a device before the monitor starts.
    #[must_use]
    pub fn with_connected(mut self, device: SimDevice) -> Self {
        self.connected.insert(device.id, device);
        self
    }

    /// Append a round of steps, delivered by one `handle_events` call.
    pub fn push_round(&mut self, steps: Vec<BusStep>) {
        self.rounds.push_back(steps);
        self.exhausted.store(false, Ordering::Relaxed);
    }

    /// Flag raised once `handle_events` finds the script empty.
    pub fn exhausted_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exhausted)
    }

    /// Rounds not yet delivered.
    pub fn pending_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Number of `handle_events` calls.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Timeout passed to the most recent `handle_events` call.
    pub fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout
    }

    /// Whether a device is currently plugged in.
    pub fn is_connected(&self, device_id: u32) -> bool {
        self.connected.contains_key(&device_id)
    }

    /// Every handle opened so far, in order.
    pub fn handles(&self) -> &[HandleRecord] {
        &self.handles
    }

    /// Handles opened but not yet closed.
    pub fn live_handles(&self) -> usize {
        self.handles.iter().filter(|h| !h.closed).count()
    }

    /// Close calls for handles that were already closed or never opened.
    pub fn double_closes(&self) -> usize {
        self.double_closes
    }

    fn notify_arrival(&self, device: SimDevice) {
        if self.filter.matches(&device.ids) {
            if let Some(sink) = &self.sink {
                sink.arrived(device);
            }
        }
    }

    fn notify_removal(&self, device: SimDevice) {
        if self.filter.matches(&device.ids) {
            if let Some(sink) = &self.sink {
                sink.left(device);
            }
        }
    }

    fn apply(&mut self, step: BusStep, failure: &mut Option<String>) {
        match step {
            BusStep::Attach(device) => {
                if self.connected.insert(device.id, device).is_some() {
                    tracing::warn!(device_id = device.id, "Device attached twice");
                }
                self.notify_arrival(device);
            },
            BusStep::Detach(device_id) => match self.connected.remove(&device_id) {
                Some(device) => self.notify_removal(device),
                None => tracing::warn!(device_id, "Detach of unknown device"),
            },
            BusStep::Fail(reason) => *failure = Some(reason),
        }
    }
}

impl UsbBackend for SimBus {
    type Device = SimDevice;
    type Handle = SimHandle;

    fn has_hotplug(&self) -> bool {
        self.hotplug_supported
    }

    fn register(
        &mut self,
        filter: &MatchFilter,
        enumerate: bool,
        sink: EventSink<Self::Device>,
    ) -> Result<(), BackendError> {
        if let Some(reason) = &self.registration_error {
            return Err(BackendError::Registration { reason: reason.clone() });
        }

        self.filter = *filter;
        self.sink = Some(sink);

        if enumerate {
            let present: Vec<SimDevice> = self.connected.values().copied().collect();
            for device in present {
                self.notify_arrival(device);
            }
        }

        Ok(())
    }

    fn handle_events(&mut self, timeout: Option<Duration>) -> Result<(), BackendError> {
        self.polls += 1;
        self.last_timeout = timeout;

        let Some(round) = self.rounds.pop_front() else {
            self.exhausted.store(true, Ordering::Relaxed);
            return Ok(());
        };

        let mut failure = None;
        for step in round {
            self.apply(step, &mut failure);
        }

        match failure {
            Some(reason) => Err(BackendError::Events { reason }),
            None => Ok(()),
        }
    }

    fn describe(&self, device: &Self::Device) -> Result<DeviceIds, BackendError> {
        if device.readable {
            Ok(device.ids)
        } else {
            Err(BackendError::Descriptor { reason: "Input/Output Error".to_string() })
        }
    }

    fn open(&mut self, device: &Self::Device) -> Result<Self::Handle, BackendError> {
        if !self.connected.contains_key(&device.id) {
            return Err(BackendError::Access {
                reason: "No such device (it may have been disconnected)".to_string(),
            });
        }
        if !device.accessible {
            return Err(BackendError::Access {
                reason: "Access denied (insufficient permissions)".to_string(),
            });
        }

        let serial = self.handles.len() as u64;
        self.handles.push(HandleRecord { serial, device_id: device.id, closed: false });

        Ok(SimHandle { serial, device_id: device.id })
    }

    fn close(&mut self, handle: Self::Handle) {
        match self.handles.iter_mut().find(|h| h.serial == handle.serial) {
            Some(record) if !record.closed => record.closed = true,
            _ => self.double_closes += 1,
        }
    }
}
