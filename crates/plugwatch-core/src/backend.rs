//! USB backend abstraction.
//!
//! The `UsbBackend` trait decouples the monitor loop from the USB library.
//! This enables:
//!
//! - Production Runtime: libusb (through `rusb`) delivers real hotplug events.
//!
//! - Simulation: A scripted bus replays attach/detach sequences, descriptor
//!   and access failures, without hardware.
//!
//! # Callback model
//!
//! Hotplug callbacks fire from inside [`UsbBackend::handle_events`], and
//! with enumeration enabled also from inside [`UsbBackend::register`]. They
//! only push a [`HotplugNotice`] into the [`EventSink`] given at
//! registration; the driver drains the sink once `handle_events` returns and
//! does the descriptor lookup and open itself.

use std::{
    fmt,
    sync::mpsc::{self, Receiver, Sender},
    time::Duration,
};

use crate::{device::DeviceIds, error::BackendError, event::HotplugNotice, filter::MatchFilter};

/// Abstract USB host library with hotplug support.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// 1. Notices are only pushed from within `register` (enumerated devices)
///    or `handle_events`, and never after a failed `register`
/// 2. Only devices matching the registered filter are notified
/// 3. Dropping a `Handle` (or passing it to `close`) releases the device
pub trait UsbBackend {
    /// Device reference delivered by hotplug callbacks.
    type Device: Clone + fmt::Debug + Send + 'static;

    /// An open device handle.
    type Handle;

    /// Whether this platform can deliver hotplug events at all.
    fn has_hotplug(&self) -> bool;

    /// Register the arrival and removal callbacks.
    ///
    /// With `enumerate` set, devices already connected are notified as
    /// arrivals before this returns. The driver picks them up after its
    /// first `handle_events` call.
    fn register(
        &mut self,
        filter: &MatchFilter,
        enumerate: bool,
        sink: EventSink<Self::Device>,
    ) -> Result<(), BackendError>;

    /// Handle pending events, blocking for at most `timeout` (`None` means
    /// the library default).
    fn handle_events(&mut self, timeout: Option<Duration>) -> Result<(), BackendError>;

    /// Read the identification fields of a device.
    fn describe(&self, device: &Self::Device) -> Result<DeviceIds, BackendError>;

    /// Open a device.
    fn open(&mut self, device: &Self::Device) -> Result<Self::Handle, BackendError>;

    /// Close a handle.
    fn close(&mut self, handle: Self::Handle) {
        drop(handle);
    }
}

/// Sending half of the notice queue, owned by backend callbacks.
pub struct EventSink<D> {
    sender: Sender<HotplugNotice<D>>,
}

impl<D> Clone for EventSink<D> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<D> fmt::Debug for EventSink<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

impl<D> EventSink<D> {
    /// Create a sink and the receiver the driver drains.
    pub fn channel() -> (Self, Receiver<HotplugNotice<D>>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }

    /// Record a notice. Returns false if the receiver is gone.
    pub fn notify(&self, notice: HotplugNotice<D>) -> bool {
        self.sender.send(notice).is_ok()
    }

    /// Record an arrival.
    pub fn arrived(&self, device: D) -> bool {
        self.notify(HotplugNotice::Arrived(device))
    }

    /// Record a removal.
    pub fn left(&self, device: D) -> bool {
        self.notify(HotplugNotice::Left(device))
    }
}
