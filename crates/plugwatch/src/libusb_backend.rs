//! Production backend using libusb through `rusb`.
//!
//! `LibusbBackend` registers a single hotplug callback object whose
//! `device_arrived` and `device_left` methods act as the arrival and removal
//! callbacks. Both only forward the device into the [`EventSink`].

use std::time::Duration;

use plugwatch_core::{BackendError, DeviceIds, EventSink, MatchFilter, UsbBackend};
use rusb::{Context, Device, DeviceHandle, Hotplug, HotplugBuilder, Registration, UsbContext};

/// libusb backed [`UsbBackend`].
pub struct LibusbBackend {
    context: Context,
    /// Keeps the callbacks registered; dropping it deregisters them.
    registration: Option<Registration<Context>>,
}

impl LibusbBackend {
    /// Initialise a libusb context.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Init`] if libusb cannot be initialised.
    pub fn new() -> Result<Self, BackendError> {
        tracing::debug!("Using libusb {}", library_version());

        let context = Context::new().map_err(|e| BackendError::Init { reason: e.to_string() })?;

        Ok(Self { context, registration: None })
    }
}

/// Version string of the linked libusb.
pub fn library_version() -> String {
    let version = rusb::version();
    format!("{}.{}.{}.{}", version.major(), version.minor(), version.micro(), version.nano())
}

/// Hotplug callbacks forwarding into the monitor's notice queue.
struct SinkCallbacks {
    sink: EventSink<Device<Context>>,
}

impl Hotplug<Context> for SinkCallbacks {
    fn device_arrived(&mut self, device: Device<Context>) {
        if !self.sink.arrived(device) {
            tracing::warn!("Arrival dropped, monitor is gone");
        }
    }

    fn device_left(&mut self, device: Device<Context>) {
        if !self.sink.left(device) {
            tracing::warn!("Removal dropped, monitor is gone");
        }
    }
}

impl UsbBackend for LibusbBackend {
    type Device = Device<Context>;
    type Handle = DeviceHandle<Context>;

    fn has_hotplug(&self) -> bool {
        rusb::has_hotplug()
    }

    fn register(
        &mut self,
        filter: &MatchFilter,
        enumerate: bool,
        sink: EventSink<Self::Device>,
    ) -> Result<(), BackendError> {
        let mut builder = HotplugBuilder::new();
        builder.enumerate(enumerate);
        if let Some(vendor_id) = filter.vendor_id {
            builder.vendor_id(vendor_id);
        }
        if let Some(product_id) = filter.product_id {
            builder.product_id(product_id);
        }
        if let Some(class_code) = filter.class_code {
            builder.class(class_code);
        }

        let callbacks: Box<dyn Hotplug<Context>> = Box::new(SinkCallbacks { sink });
        let registration = builder
            .register(&self.context, callbacks)
            .map_err(|e| BackendError::Registration { reason: e.to_string() })?;

        self.registration = Some(registration);
        Ok(())
    }

    fn handle_events(&mut self, timeout: Option<Duration>) -> Result<(), BackendError> {
        self.context
            .handle_events(timeout)
            .map_err(|e| BackendError::Events { reason: e.to_string() })
    }

    fn describe(&self, device: &Self::Device) -> Result<DeviceIds, BackendError> {
        device
            .device_descriptor()
            .map(|desc| DeviceIds::new(desc.vendor_id(), desc.product_id(), desc.class_code()))
            .map_err(|e| BackendError::Descriptor { reason: e.to_string() })
    }

    fn open(&mut self, device: &Self::Device) -> Result<Self::Handle, BackendError> {
        device.open().map_err(|e| BackendError::Access { reason: e.to_string() })
    }

    fn close(&mut self, handle: Self::Handle) {
        let device = handle.device();
        tracing::trace!(bus = device.bus_number(), address = device.address(), "Closing handle");
        drop(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_version_is_libusb_1() {
        assert!(library_version().starts_with("1."), "unexpected version {}", library_version());
    }
}
