//! Scenario builder.
//!
//! A scenario scripts a [`SimBus`], runs it through the real [`Driver`] and
//! hands the resulting [`World`] to oracles.
//!
//! ```rust,ignore
//! Scenario::new()
//!     .attach(SimDevice::new(1, 0x046d, 0xc52b))
//!     .detach(1)
//!     .oracle(Box::new(|world| {
//!         if world.reports() != ["Device attached: 046d:c52b", "Device detached: 046d:c52b"] {
//!             return Err(format!("unexpected reports {:?}", world.reports()));
//!         }
//!         Ok(())
//!     }))
//!     .run()?;
//! ```

use plugwatch::{Driver, DriverError, MonitorConfig, RunSummary};
use plugwatch_core::MatchFilter;

use crate::sim_bus::{BusStep, SimBus, SimDevice};

/// Check run against the finished world.
pub type Oracle = Box<dyn Fn(&World) -> Result<(), String>>;

/// Errors from running a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// An oracle rejected the outcome.
    #[error("oracle {index} failed: {reason}")]
    OracleFailed {
        /// Position of the oracle in registration order.
        index: usize,
        /// Oracle's explanation.
        reason: String,
    },
}

/// Outcome of a scenario run.
#[derive(Debug)]
pub struct World {
    reports: Vec<String>,
    outcome: Result<RunSummary, DriverError>,
    bus: SimBus,
}

impl World {
    /// Report lines written by the driver, in order.
    pub fn reports(&self) -> &[String] {
        &self.reports
    }

    /// The driver's result.
    pub fn outcome(&self) -> &Result<RunSummary, DriverError> {
        &self.outcome
    }

    /// The summary, if the run succeeded.
    pub fn summary(&self) -> Option<&RunSummary> {
        self.outcome.as_ref().ok()
    }

    /// The bus after the run.
    pub fn bus(&self) -> &SimBus {
        &self.bus
    }
}

/// Scripted monitor run.
pub struct Scenario {
    bus: SimBus,
    config: MonitorConfig,
    oracles: Vec<Oracle>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Empty scenario on a bus with hotplug support and default config.
    pub fn new() -> Self {
        Self { bus: SimBus::new(), config: MonitorConfig::default(), oracles: Vec::new() }
    }

    /// Replace the bus (for unsupported or refusing buses).
    #[must_use]
    pub fn with_bus(mut self, bus: SimBus) -> Self {
        self.bus = bus;
        self
    }

    /// Set the match filter.
    #[must_use]
    pub fn with_filter(mut self, filter: MatchFilter) -> Self {
        self.config.filter = filter;
        self
    }

    /// Report devices connected before start.
    #[must_use]
    pub fn with_enumerate(mut self) -> Self {
        self.config.enumerate = true;
        self
    }

    /// Connect a device before start.
    #[must_use]
    pub fn connected(mut self, device: SimDevice) -> Self {
        self.bus = self.bus.with_connected(device);
        self
    }

    /// Append a round with several steps.
    #[must_use]
    pub fn round(mut self, steps: Vec<BusStep>) -> Self {
        self.bus.push_round(steps);
        self
    }

    /// Append a round attaching one device.
    #[must_use]
    pub fn attach(self, device: SimDevice) -> Self {
        self.round(vec![BusStep::Attach(device)])
    }

    /// Append a round detaching one device.
    #[must_use]
    pub fn detach(self, device_id: u32) -> Self {
        self.round(vec![BusStep::Detach(device_id)])
    }

    /// Append a round whose event handling fails.
    #[must_use]
    pub fn fail(self, reason: &str) -> Self {
        self.round(vec![BusStep::Fail(reason.to_string())])
    }

    /// Append a quiet round.
    #[must_use]
    pub fn idle(self) -> Self {
        self.round(Vec::new())
    }

    /// Add an oracle.
    #[must_use]
    pub fn oracle(mut self, oracle: Oracle) -> Self {
        self.oracles.push(oracle);
        self
    }

    /// Run the script through the driver until the monitor is done or the
    /// script runs out, then check every oracle.
    pub fn run(self) -> Result<World, ScenarioError> {
        let stop = self.bus.exhausted_flag();
        let mut driver = Driver::new(self.bus, self.config, Vec::new());

        let outcome = driver.run_until(&stop);
        let (bus, output) = driver.into_parts();

        let reports = String::from_utf8_lossy(&output).lines().map(str::to_string).collect();
        let world = World { reports, outcome, bus };

        for (index, oracle) in self.oracles.iter().enumerate() {
            oracle(&world).map_err(|reason| ScenarioError::OracleFailed { index, reason })?;
        }

        Ok(world)
    }
}
