//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! driver behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!     ModelMonitor    Driver<SimBus>   Compare
//!     (reference)     (real)           Observable state
//! ```

use plugwatch::{Driver, MonitorConfig};
use plugwatch_harness::{ModelMonitor, ObservableState, Operation, SimBus};
use proptest::prelude::*;

/// Real system wrapper that mirrors ModelMonitor's interface.
struct RealWorld {
    driver: Driver<SimBus, Vec<u8>>,
}

impl RealWorld {
    fn new() -> Self {
        let mut driver = Driver::new(SimBus::new(), MonitorConfig::default(), Vec::new());
        driver.start().unwrap();
        Self { driver }
    }

    fn apply(&mut self, op: &Operation) {
        self.driver.backend_mut().push_round(op.to_steps());
        self.driver.poll_once().unwrap();
    }

    fn observable_state(&self) -> ObservableState {
        let monitor = self.driver.monitor();
        ObservableState {
            attached: monitor.attached(),
            detached: monitor.detached(),
            handle_open: monitor.has_open_handle(),
            done: monitor.is_done(),
            reports: String::from_utf8_lossy(self.driver.reports())
                .lines()
                .map(str::to_string)
                .collect(),
        }
    }
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (any::<u8>(), prop::bool::weighted(0.8), prop::bool::weighted(0.7))
            .prop_map(|(slot, readable, accessible)| Operation::Attach { slot, readable, accessible }),
        4 => any::<u8>().prop_map(|slot| Operation::Detach { slot }),
        1 => Just(Operation::EventsFail),
        1 => Just(Operation::Idle),
    ]
}

proptest! {
    #[test]
    fn prop_driver_matches_model(ops in prop::collection::vec(operation(), 1..48)) {
        let mut model = ModelMonitor::new();
        let mut real = RealWorld::new();

        for op in &ops {
            // The real loop stops polling once done
            if model.is_done() {
                break;
            }

            model.apply(op);
            real.apply(op);

            prop_assert_eq!(model.observable_state(), real.observable_state(), "after {:?}", op);
        }
    }

    #[test]
    fn prop_every_handle_closed_after_run(ops in prop::collection::vec(operation(), 0..48)) {
        let mut model = ModelMonitor::new();
        let mut bus = SimBus::new();
        for op in &ops {
            bus.push_round(op.to_steps());
        }
        let stop = bus.exhausted_flag();

        let mut driver = Driver::new(bus, MonitorConfig::default(), Vec::new());
        let summary = driver.run_until(&stop).unwrap();

        for op in ops.iter().take(summary.polls as usize) {
            model.apply(op);
        }
        model.shutdown();

        let (bus, output) = driver.into_parts();
        let reports: Vec<String> =
            String::from_utf8_lossy(&output).lines().map(str::to_string).collect();

        // PROPERTY: no handle outlives the run, none closed twice
        prop_assert_eq!(bus.live_handles(), 0);
        prop_assert_eq!(bus.double_closes(), 0);

        // PROPERTY: the loop ends on its own exactly when the model says so
        prop_assert_eq!(!summary.stopped_early, model.is_done());
        prop_assert_eq!(reports, model.observable_state().reports);
    }
}
