//! Runtime configuration.

use std::time::Duration;

use plugwatch_core::MatchFilter;

/// Default upper bound on a single `handle_events` call.
///
/// Bounds how long a stop request can go unnoticed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Which devices trigger the callbacks.
    pub filter: MatchFilter,
    /// Also report devices already connected at start.
    pub enumerate: bool,
    /// Timeout for each round of event handling.
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { filter: MatchFilter::any(), enumerate: false, poll_interval: DEFAULT_POLL_INTERVAL }
    }
}
