//! Plugwatch Core
//!
//! Action-based state machine for observing USB hotplug events. The monitor
//! counts device arrivals and removals, keeps at most one device handle open
//! and decides when the observation loop is finished.
//!
//! # Architecture
//!
//! The monitor is a pure state machine that:
//! - Receives events from the caller (arrivals, removals, open results)
//! - Produces actions for the caller to execute (open, close, report, log)
//! - Never touches the USB stack itself. Hardware access goes through the
//!   [`UsbBackend`] trait, implemented by libusb in production and by a
//!   simulated bus in tests.
//!
//! # Components
//!
//! - [`Monitor`]: Counters, handle slot and termination condition
//! - [`MatchFilter`]: Vendor/product/class filter passed to the backend
//! - [`MonitorEvent`]: Events fed into the monitor
//! - [`MonitorAction`]: Actions produced by the monitor

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backend;
mod device;
pub mod error;
mod event;
pub mod filter;
mod monitor;

pub use backend::{EventSink, UsbBackend};
pub use device::DeviceIds;
pub use error::{BackendError, FilterError};
pub use event::{CloseReason, HotplugNotice, LogLevel, MonitorAction, MonitorEvent, Report};
pub use filter::MatchFilter;
pub use monitor::{Monitor, MonitorStats};
