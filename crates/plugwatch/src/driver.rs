//! Monitor driver.
//!
//! Runs the hotplug loop: pumps backend events, feeds the resulting notices
//! into the [`Monitor`] and executes the actions it returns. The driver owns
//! every side effect (device I/O, report output, logging) so the monitor can
//! stay a pure state machine.

use std::{
    collections::VecDeque,
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Receiver,
    },
};

use plugwatch_core::{
    BackendError, EventSink, HotplugNotice, LogLevel, Monitor, MonitorAction, MonitorEvent,
    UsbBackend,
};

use crate::{config::MonitorConfig, error::DriverError};

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Devices that arrived.
    pub attached: u64,
    /// Devices that left.
    pub detached: u64,
    /// Rounds of event handling performed.
    pub polls: u64,
    /// Whether the loop ended on a stop request rather than on its own
    /// termination condition.
    pub stopped_early: bool,
}

/// Drives a [`Monitor`] with events from a [`UsbBackend`].
///
/// Report lines are written to `W` (stdout in production).
pub struct Driver<B: UsbBackend, W: Write> {
    backend: B,
    monitor: Monitor<B::Device, B::Handle>,
    config: MonitorConfig,
    /// Notice queue, present once callbacks are registered.
    notices: Option<Receiver<HotplugNotice<B::Device>>>,
    reports: W,
    polls: u64,
}

impl<B: UsbBackend, W: Write> Driver<B, W> {
    /// Create a driver. Nothing is registered until [`Driver::start`].
    pub fn new(backend: B, config: MonitorConfig, reports: W) -> Self {
        Self { backend, monitor: Monitor::new(), config, notices: None, reports, polls: 0 }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The monitor state.
    pub fn monitor(&self) -> &Monitor<B::Device, B::Handle> {
        &self.monitor
    }

    /// The report sink.
    pub fn reports(&self) -> &W {
        &self.reports
    }

    /// Consume the driver, returning backend and report sink.
    pub fn into_parts(self) -> (B, W) {
        (self.backend, self.reports)
    }

    /// Whether hotplug callbacks are registered.
    pub fn is_started(&self) -> bool {
        self.notices.is_some()
    }

    /// Check hotplug support and register the callbacks.
    ///
    /// Calling this again after a successful start is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The platform has no hotplug support
    /// - Callback registration fails
    pub fn start(&mut self) -> Result<(), DriverError> {
        if self.is_started() {
            return Ok(());
        }

        if !self.backend.has_hotplug() {
            return Err(BackendError::HotplugUnsupported.into());
        }

        let (sink, receiver) = EventSink::channel();
        self.backend.register(&self.config.filter, self.config.enumerate, sink)?;
        self.notices = Some(receiver);

        tracing::info!(
            filter = %self.config.filter,
            enumerate = self.config.enumerate,
            "Hotplug callbacks registered"
        );

        Ok(())
    }

    /// Run one round of event handling and process every notice it produced.
    ///
    /// A failed round is logged and otherwise ignored.
    pub fn poll_once(&mut self) -> Result<(), DriverError> {
        if !self.is_started() {
            return Err(DriverError::NotStarted);
        }

        self.polls += 1;
        if let Err(e) = self.backend.handle_events(Some(self.config.poll_interval)) {
            self.dispatch(MonitorEvent::EventsFailed { reason: e.reason().to_string() })?;
        }

        let pending: Vec<_> = match &self.notices {
            Some(receiver) => receiver.try_iter().collect(),
            None => Vec::new(),
        };

        for notice in pending {
            self.process_notice(notice)?;
        }

        Ok(())
    }

    /// Run until the monitor is done.
    pub fn run(&mut self) -> Result<RunSummary, DriverError> {
        self.run_until(&AtomicBool::new(false))
    }

    /// Run until the monitor is done or `stop` is set.
    ///
    /// Registers the callbacks first if that has not happened yet. Any
    /// handle still open at the end is closed.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Finished`] if an earlier run already shut the
    /// monitor down.
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<RunSummary, DriverError> {
        if self.monitor.is_shut_down() {
            return Err(DriverError::Finished);
        }
        self.start()?;

        let mut stopped_early = false;
        while !self.monitor.is_done() {
            if stop.load(Ordering::Relaxed) {
                tracing::info!("Stop requested, leaving event loop");
                stopped_early = true;
                break;
            }
            self.poll_once()?;
        }

        self.dispatch(MonitorEvent::Shutdown)?;

        let stats = self.monitor.stats();
        tracing::debug!(attached = stats.attached, detached = stats.detached, "Event loop finished");

        Ok(RunSummary {
            attached: stats.attached,
            detached: stats.detached,
            polls: self.polls,
            stopped_early,
        })
    }

    /// Turn a raw notice into a monitor event, reading the descriptor.
    fn process_notice(&mut self, notice: HotplugNotice<B::Device>) -> Result<(), DriverError> {
        let event = match notice {
            HotplugNotice::Arrived(device) => {
                tracing::debug!(?device, "Device arrived");
                let ids = self.backend.describe(&device).map_err(|e| e.reason().to_string());
                MonitorEvent::DeviceArrived { device, ids }
            },
            HotplugNotice::Left(device) => {
                tracing::debug!(?device, "Device left");
                let ids = self.backend.describe(&device).map_err(|e| e.reason().to_string());
                MonitorEvent::DeviceLeft { ids }
            },
        };

        self.dispatch(event)
    }

    /// Feed an event and execute actions until no follow-up events remain.
    fn dispatch(&mut self, event: MonitorEvent<B::Device, B::Handle>) -> Result<(), DriverError> {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            for action in self.monitor.handle(event) {
                if let Some(follow_up) = self.execute(action)? {
                    queue.push_back(follow_up);
                }
            }
        }

        Ok(())
    }

    /// Execute one action, returning the event it produces, if any.
    fn execute(
        &mut self,
        action: MonitorAction<B::Device, B::Handle>,
    ) -> Result<Option<MonitorEvent<B::Device, B::Handle>>, DriverError> {
        match action {
            MonitorAction::Report(report) => {
                writeln!(self.reports, "{report}")?;
                self.reports.flush()?;
                Ok(None)
            },

            MonitorAction::Open { device } => match self.backend.open(&device) {
                Ok(handle) => {
                    tracing::debug!(?device, "Opened device");
                    Ok(Some(MonitorEvent::DeviceOpened { handle }))
                },
                Err(e) => Ok(Some(MonitorEvent::OpenFailed { reason: e.reason().to_string() })),
            },

            MonitorAction::Close { handle, reason } => {
                tracing::debug!(%reason, "Closing device handle");
                self.backend.close(handle);
                Ok(None)
            },

            MonitorAction::Log { level, message } => {
                match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                }
                Ok(None)
            },
        }
    }
}
