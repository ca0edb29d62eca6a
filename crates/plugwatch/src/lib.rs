//! Plugwatch USB hotplug monitor.
//!
//! This crate provides the production runtime:
//! - libusb (via `rusb`) for hotplug delivery and device access
//! - A blocking driver loop around the sans-IO monitor
//!
//! ## Architecture
//!
//! ```text
//! plugwatch
//!   ├─ LibusbBackend    (production UsbBackend impl)
//!   ├─ Driver           (event loop, executes monitor actions)
//!   └─ Monitor          (plugwatch-core state machine)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod error;
mod libusb_backend;

use std::{io, sync::atomic::AtomicBool};

pub use config::{DEFAULT_POLL_INTERVAL, MonitorConfig};
pub use driver::{Driver, RunSummary};
pub use error::DriverError;
pub use libusb_backend::{LibusbBackend, library_version};

/// Watch for hotplug events with libusb, reporting to stdout.
///
/// Blocks until every arrived device has left again or `stop` is set.
///
/// # Errors
///
/// Returns error if libusb cannot be initialised, lacks hotplug support or
/// refuses the callback registration.
pub fn watch(config: MonitorConfig, stop: &AtomicBool) -> Result<RunSummary, DriverError> {
    let backend = LibusbBackend::new()?;
    let mut driver = Driver::new(backend, config, io::stdout());

    driver.start()?;
    driver.run_until(stop)
}
