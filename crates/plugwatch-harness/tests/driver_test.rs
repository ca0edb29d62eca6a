//! Driver tests
//!
//! Run the real driver against scripted buses.

use std::time::Duration;

use plugwatch::{Driver, DriverError, MonitorConfig};
use plugwatch_core::{BackendError, MatchFilter};
use plugwatch_harness::{BusStep, Scenario, SimBus, SimDevice};

fn mouse() -> SimDevice {
    SimDevice::new(1, 0x046d, 0xc52b)
}

fn hub() -> SimDevice {
    SimDevice::new(2, 0x1d6b, 0x0002).with_class(9)
}

#[test]
fn attach_then_detach_finishes() {
    let world = Scenario::new().idle().attach(mouse()).detach(1).run().unwrap();

    assert_eq!(world.reports(), ["Device attached: 046d:c52b", "Device detached: 046d:c52b"]);

    let summary = world.summary().unwrap();
    assert_eq!(summary.attached, 1);
    assert_eq!(summary.detached, 1);
    assert!(!summary.stopped_early);
    assert_eq!(world.bus().handles().len(), 1);
    assert_eq!(world.bus().live_handles(), 0);
}

#[test]
fn loop_ends_as_soon_as_detaches_catch_up() {
    // The last round is never consumed
    let world = Scenario::new().attach(mouse()).detach(1).attach(hub()).run().unwrap();

    assert_eq!(world.bus().pending_rounds(), 1);
    assert_eq!(world.summary().unwrap().polls, 2);
}

#[test]
fn removals_before_first_arrival_keep_loop_running() {
    let world = Scenario::new().connected(hub()).detach(2).idle().run().unwrap();

    assert_eq!(world.reports(), ["Device detached: 1d6b:0002"]);
    let summary = world.summary().unwrap();
    assert_eq!((summary.attached, summary.detached), (0, 1));
    // Only the exhausted script ended the loop
    assert!(summary.stopped_early);
}

#[test]
fn early_removal_counts_toward_termination() {
    let world = Scenario::new()
        .connected(hub())
        .detach(2)
        .attach(mouse())
        .detach(1)
        .run()
        .unwrap();

    // One removal already matches the first arrival
    assert_eq!(
        world.reports(),
        [
            "Device detached: 1d6b:0002",
            "Device attached: 046d:c52b",
            "Warning: Closing left-over open handle"
        ]
    );
    let summary = world.summary().unwrap();
    assert_eq!((summary.attached, summary.detached), (1, 1));
    assert!(!summary.stopped_early);
    assert_eq!(world.bus().pending_rounds(), 1);
}

#[test]
fn newer_arrival_replaces_open_handle() {
    let world = Scenario::new()
        .attach(mouse())
        .attach(hub())
        .oracle(Box::new(|world| {
            let handles = world.bus().handles();
            // Mouse handle was closed when the hub was opened
            if handles.len() != 2 || !handles[0].closed || handles[1].device_id != 2 {
                return Err(format!("unexpected handles {handles:?}"));
            }
            Ok(())
        }))
        .run()
        .unwrap();

    // Script ran out with the hub still open
    assert!(world.summary().unwrap().stopped_early);
    assert_eq!(world.reports().last().unwrap(), "Warning: Closing left-over open handle");
    assert_eq!(world.bus().live_handles(), 0);
}

#[test]
fn any_removal_closes_the_single_handle() {
    let world = Scenario::new()
        .connected(hub())
        .attach(mouse())
        .detach(2)
        .run()
        .unwrap();

    // The hub left, but the mouse handle was the one held
    assert_eq!(world.bus().handles()[0].device_id, 1);
    assert!(world.bus().handles()[0].closed);
    assert!(!world.reports().iter().any(|r| r.starts_with("Warning")));
}

#[test]
fn unreadable_descriptor_reports_bare_line() {
    let world = Scenario::new().attach(mouse().unreadable()).detach(1).run().unwrap();

    assert_eq!(world.reports(), ["Device attached", "Device detached"]);
    // Still opened
    assert_eq!(world.bus().handles().len(), 1);
}

#[test]
fn denied_open_still_counts_as_arrival() {
    let world = Scenario::new().attach(mouse().denied()).detach(1).run().unwrap();

    let summary = world.summary().unwrap();
    assert_eq!(summary.attached, 1);
    assert!(!summary.stopped_early);
    assert!(world.bus().handles().is_empty());
}

#[test]
fn event_loop_errors_do_not_terminate() {
    let world = Scenario::new()
        .fail("interrupted")
        .attach(mouse())
        .fail("interrupted")
        .detach(1)
        .run()
        .unwrap();

    let summary = world.summary().unwrap();
    assert_eq!(summary.polls, 4);
    assert!(!summary.stopped_early);
}

#[test]
fn arrival_and_removal_in_one_round() {
    let world = Scenario::new()
        .round(vec![BusStep::Attach(mouse()), BusStep::Detach(1)])
        .run()
        .unwrap();

    // The device is already gone when the driver tries to open it
    assert_eq!(world.reports().len(), 2);
    assert!(world.bus().handles().is_empty());
    assert!(!world.summary().unwrap().stopped_early);
}

#[test]
fn filtered_devices_are_never_reported() {
    let world = Scenario::new()
        .with_filter(MatchFilter::any().with_vendor_id(0x046d))
        .attach(hub())
        .attach(mouse())
        .detach(2)
        .detach(1)
        .run()
        .unwrap();

    assert_eq!(world.reports(), ["Device attached: 046d:c52b", "Device detached: 046d:c52b"]);
}

#[test]
fn class_filter_applies() {
    let world = Scenario::new()
        .with_filter(MatchFilter::any().with_class_code(9))
        .attach(mouse())
        .attach(hub())
        .detach(2)
        .run()
        .unwrap();

    assert_eq!(world.reports(), ["Device attached: 1d6b:0002", "Device detached: 1d6b:0002"]);
}

#[test]
fn enumerate_reports_present_devices() {
    let world = Scenario::new().with_enumerate().connected(hub()).detach(2).run().unwrap();

    assert_eq!(world.reports(), ["Device attached: 1d6b:0002", "Device detached: 1d6b:0002"]);
    assert!(!world.summary().unwrap().stopped_early);
}

#[test]
fn present_devices_are_silent_without_enumerate() {
    let world = Scenario::new().connected(hub()).idle().run().unwrap();

    assert!(world.reports().is_empty());
    assert!(world.summary().unwrap().stopped_early);
}

#[test]
fn missing_hotplug_support_is_fatal() {
    let world =
        Scenario::new().with_bus(SimBus::new().without_hotplug()).attach(mouse()).run().unwrap();

    assert!(matches!(
        world.outcome(),
        Err(DriverError::Backend(BackendError::HotplugUnsupported))
    ));
    assert_eq!(world.bus().polls(), 0);
}

#[test]
fn registration_failure_is_fatal() {
    let world = Scenario::new()
        .with_bus(SimBus::new().refusing_registration("Resource busy"))
        .run()
        .unwrap();

    match world.outcome() {
        Err(DriverError::Backend(err)) => {
            assert!(err.is_fatal());
            assert_eq!(err.to_string(), "error registering hotplug callback: Resource busy");
        },
        other => panic!("expected registration error, got {other:?}"),
    }
}

#[test]
fn poll_before_start_is_rejected() {
    let mut driver = Driver::new(SimBus::new(), MonitorConfig::default(), Vec::new());

    assert!(matches!(driver.poll_once(), Err(DriverError::NotStarted)));
}

#[test]
fn start_is_idempotent() {
    let mut driver =
        Driver::new(SimBus::new().with_connected(mouse()), MonitorConfig::default(), Vec::new());

    driver.start().unwrap();
    driver.start().unwrap();
    assert!(driver.is_started());
}

#[test]
fn stepwise_polling_tracks_monitor() {
    let mut driver = Driver::new(SimBus::new(), MonitorConfig::default(), Vec::new());
    driver.start().unwrap();

    driver.backend_mut().push_round(vec![BusStep::Attach(mouse())]);
    driver.poll_once().unwrap();
    assert!(driver.monitor().has_open_handle());
    assert!(!driver.monitor().is_done());

    driver.backend_mut().push_round(vec![BusStep::Detach(1)]);
    driver.poll_once().unwrap();
    assert!(!driver.monitor().has_open_handle());
    assert!(driver.monitor().is_done());

    let output = String::from_utf8(driver.reports().clone()).unwrap();
    assert_eq!(output, "Device attached: 046d:c52b\nDevice detached: 046d:c52b\n");
}

#[test]
fn poll_interval_reaches_backend() {
    let config = MonitorConfig { poll_interval: Duration::from_millis(250), ..MonitorConfig::default() };
    let mut driver = Driver::new(SimBus::new(), config, Vec::new());
    driver.start().unwrap();

    driver.poll_once().unwrap();

    assert_eq!(driver.backend().last_timeout(), Some(Duration::from_millis(250)));
}

#[test]
fn second_run_after_shutdown_is_rejected() {
    let mut bus = SimBus::new();
    bus.push_round(vec![BusStep::Attach(mouse())]);
    let stop = bus.exhausted_flag();
    let mut driver = Driver::new(bus, MonitorConfig::default(), Vec::new());

    assert!(driver.run_until(&stop).unwrap().stopped_early);

    // Pushing a round clears the exhaustion flag
    driver.backend_mut().push_round(vec![BusStep::Detach(1)]);
    assert!(matches!(driver.run_until(&stop), Err(DriverError::Finished)));
    assert_eq!(driver.backend().pending_rounds(), 1);
}

#[test]
fn failing_oracle_is_reported() {
    let result = Scenario::new()
        .attach(mouse())
        .detach(1)
        .oracle(Box::new(|_| Ok(())))
        .oracle(Box::new(|_| Err("nope".to_string())))
        .run();

    assert!(matches!(
        result,
        Err(plugwatch_harness::ScenarioError::OracleFailed { index: 1, .. })
    ));
}
