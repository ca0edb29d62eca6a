//! Reference model for model-based testing.
//!
//! The model is a simplified implementation of the monitor loop: plain
//! counters, a single slot holding the id of the device whose handle is open,
//! and the expected report lines. It serves as the oracle against which the
//! driver running on a [`SimBus`](crate::SimBus) is verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Deterministic: Same operations produce same observable state

mod monitor;
pub mod operation;

pub use monitor::{ModelMonitor, ObservableState};
pub use operation::{Operation, SLOTS};
