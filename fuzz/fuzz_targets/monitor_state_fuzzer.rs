//! Fuzz target for [`Monitor`] state machine
//!
//! Prevent handle leaks and double closes through odd event orderings
//!
//! # Strategy
//!
//! - Event sequences: Arbitrary arrivals, removals, open results, loop
//!   failures and shutdowns in any order
//! - Late results: Open results arriving after shutdown
//!
//! # Invariants
//!
//! - Every handle given to the monitor comes back in exactly one `Close`
//!   once `Shutdown` has been processed
//! - At most one handle is held at any time
//! - Counters never decrease
//! - `is_done()` iff `attached > 0 && detached >= attached`
//! - NEVER panic on any event order

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use plugwatch_core::{DeviceIds, Monitor, MonitorAction, MonitorEvent};

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    Arrived { vendor_id: u16, product_id: u16, readable: bool },
    Left { vendor_id: u16, product_id: u16, readable: bool },
    Opened,
    OpenFailed,
    EventsFailed,
    Shutdown,
}

fn ids(vendor_id: u16, product_id: u16, readable: bool) -> Result<DeviceIds, String> {
    if readable { Ok(DeviceIds::new(vendor_id, product_id, 0)) } else { Err("io".to_string()) }
}

fuzz_target!(|events: Vec<FuzzEvent>| {
    let mut monitor: Monitor<u16, u32> = Monitor::new();
    let mut next_handle = 0u32;
    let mut given = HashSet::new();
    let mut returned = HashSet::new();

    for event in events.into_iter().chain(std::iter::once(FuzzEvent::Shutdown)) {
        let before = monitor.stats();

        let event = match event {
            FuzzEvent::Arrived { vendor_id, product_id, readable } => MonitorEvent::DeviceArrived {
                device: vendor_id,
                ids: ids(vendor_id, product_id, readable),
            },
            FuzzEvent::Left { vendor_id, product_id, readable } => {
                MonitorEvent::DeviceLeft { ids: ids(vendor_id, product_id, readable) }
            },
            FuzzEvent::Opened => {
                let handle = next_handle;
                next_handle += 1;
                given.insert(handle);
                MonitorEvent::DeviceOpened { handle }
            },
            FuzzEvent::OpenFailed => MonitorEvent::OpenFailed { reason: "denied".to_string() },
            FuzzEvent::EventsFailed => MonitorEvent::EventsFailed { reason: "io".to_string() },
            FuzzEvent::Shutdown => MonitorEvent::Shutdown,
        };

        for action in monitor.handle(event) {
            if let MonitorAction::Close { handle, .. } = action {
                assert!(given.contains(&handle), "closed unknown handle {handle}");
                assert!(returned.insert(handle), "handle {handle} closed twice");
            }
        }

        let after = monitor.stats();
        assert!(after.attached >= before.attached);
        assert!(after.detached >= before.detached);
        assert!(given.len() - returned.len() <= 1, "more than one handle held");
        assert_eq!(
            monitor.is_done(),
            after.attached > 0 && after.detached >= after.attached
        );
    }

    assert!(monitor.is_shut_down());
    assert_eq!(given, returned, "handle leaked past shutdown");
});
