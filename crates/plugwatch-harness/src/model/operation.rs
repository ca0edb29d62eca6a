//! Operations for model-based testing.
//!
//! Operations are generated by proptest and applied to both the model and
//! the driver. Each operation is one round of event handling.

use plugwatch_core::DeviceIds;

use crate::sim_bus::{BusStep, SimDevice};

/// Number of distinct device slots (keeps the state space small).
pub const SLOTS: u8 = 4;

/// One round on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Plug the device in `slot` in.
    Attach {
        /// Device slot, taken modulo [`SLOTS`].
        slot: u8,
        /// Whether its descriptor can be read.
        readable: bool,
        /// Whether it can be opened.
        accessible: bool,
    },

    /// Unplug the device in `slot`.
    Detach {
        /// Device slot, taken modulo [`SLOTS`].
        slot: u8,
    },

    /// Event handling fails this round.
    EventsFail,

    /// Nothing happens this round.
    Idle,
}

impl Operation {
    /// Descriptor IDs of the device in a slot.
    pub fn slot_ids(slot: u8) -> DeviceIds {
        let slot = slot % SLOTS;
        DeviceIds::new(0x1000 + u16::from(slot), 0x2000 + u16::from(slot), slot)
    }

    /// The bus steps for this round.
    pub fn to_steps(&self) -> Vec<BusStep> {
        match self {
            Self::Attach { slot, readable, accessible } => {
                let slot = slot % SLOTS;
                let ids = Self::slot_ids(slot);
                let device = SimDevice {
                    id: u32::from(slot),
                    ids,
                    readable: *readable,
                    accessible: *accessible,
                };
                vec![BusStep::Attach(device)]
            },
            Self::Detach { slot } => vec![BusStep::Detach(u32::from(slot % SLOTS))],
            Self::EventsFail => vec![BusStep::Fail("interrupted".to_string())],
            Self::Idle => Vec::new(),
        }
    }
}
