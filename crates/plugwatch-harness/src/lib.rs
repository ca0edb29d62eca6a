//! Simulation harness for plugwatch.
//!
//! Scripted implementation of the `UsbBackend` trait for deterministic,
//! hardware-free testing of the monitor loop: arrivals, removals,
//! unreadable descriptors, denied access and failing event rounds.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real driver,
//! and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod scenario;
pub mod sim_bus;

pub use model::{ModelMonitor, ObservableState, Operation};
pub use scenario::{Oracle, Scenario, ScenarioError, World};
pub use sim_bus::{BusStep, HandleRecord, SimBus, SimDevice, SimHandle};
