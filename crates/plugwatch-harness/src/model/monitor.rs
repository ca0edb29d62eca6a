//! Model monitor.
//!
//! Mirrors the monitor loop without actions or handles: what gets reported
//! and which device's handle is open.

use std::collections::BTreeMap;

use super::operation::{Operation, SLOTS};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Arrival count.
    pub attached: u64,
    /// Removal count.
    pub detached: u64,
    /// Whether a handle is open.
    pub handle_open: bool,
    /// Whether the loop would end.
    pub done: bool,
    /// Report lines so far.
    pub reports: Vec<String>,
}

/// Plugged-in device in the model.
#[derive(Debug, Clone, Copy)]
struct ModelDevice {
    readable: bool,
}

/// Model of the monitor loop over a bus.
#[derive(Debug, Clone, Default)]
pub struct ModelMonitor {
    connected: BTreeMap<u8, ModelDevice>,
    attached: u64,
    detached: u64,
    /// Slot of the device whose handle is open.
    open_slot: Option<u8>,
    reports: Vec<String>,
}

impl ModelMonitor {
    /// Empty bus, zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the loop would end.
    pub fn is_done(&self) -> bool {
        self.attached > 0 && self.detached >= self.attached
    }

    /// Apply one round.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Attach { slot, readable, accessible } => {
                let slot = slot % SLOTS;
                // Re-plugging a present device replaces it without a removal
                self.connected.insert(slot, ModelDevice { readable: *readable });
                self.attached += 1;
                self.reports.push(line("attached", slot, *readable));
                if *accessible {
                    self.open_slot = Some(slot);
                }
            },
            Operation::Detach { slot } => {
                let slot = slot % SLOTS;
                if let Some(device) = self.connected.remove(&slot) {
                    self.detached += 1;
                    self.reports.push(line("detached", slot, device.readable));
                    // Any removal releases the single handle
                    self.open_slot = None;
                }
            },
            Operation::EventsFail | Operation::Idle => {},
        }
    }

    /// Reports emitted when the loop ends.
    pub fn shutdown(&mut self) {
        if self.open_slot.take().is_some() {
            self.reports.push("Warning: Closing left-over open handle".to_string());
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            attached: self.attached,
            detached: self.detached,
            handle_open: self.open_slot.is_some(),
            done: self.is_done(),
            reports: self.reports.clone(),
        }
    }
}

fn line(verb: &str, slot: u8, readable: bool) -> String {
    if readable {
        format!("Device {verb}: {}", Operation::slot_ids(slot))
    } else {
        format!("Device {verb}")
    }
}
