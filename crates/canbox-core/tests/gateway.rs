mod common;

use canbox_core::bus::ReplayBus;
use canbox_core::calibration::Calibration;
use canbox_core::clock::ManualClock;
use canbox_core::gateway::{CycleOutcome, Gateway};
use canbox_core::output::Channel;
use canbox_core::profile::{self, ValidationError};
use canbox_core::protocol::commands;
use common::{MockLink, RecordingRestarter};
use pretty_assertions::assert_eq;

const RAW_RPM_PROFILE: &str = r#"{"name": "Raw RPM", "frames": [
    {"canId": "0x180", "fields": [
        {"target": "ENGINE_RPM", "startByte": 0, "byteCount": 2, "byteOrder": "BE", "dataType": "UINT16"}]}
]}"#;

#[test]
fn test_first_cycle_decodes_and_sends() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());

    gateway.bus_mut().push(0x180, &[0x44, 0x5C]);
    let outcome = gateway.run_cycle();
    assert_eq!(
        outcome,
        CycleOutcome::Completed {
            handled: Some(true),
            sent: Channel::ALL.len()
        }
    );

    let dashboard = gateway
        .link()
        .frames()
        .into_iter()
        .find(|p| p.command == commands::VEHICLE_INFO && p.payload[0] == commands::info::DASHBOARD)
        .unwrap();
    assert_eq!(&dashboard.payload[1..3], &[0x09, 0xC4]);
    assert_eq!(dashboard.payload[11], commands::STATUS_ENGINE_RUNNING);
}

#[test]
fn test_idle_cycle() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());
    gateway.run_cycle();

    clock.advance(10);
    assert_eq!(
        gateway.run_cycle(),
        CycleOutcome::Completed {
            handled: None,
            sent: 0
        }
    );
}

#[test]
fn test_steering_end_to_end() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());

    // raw -200: (-200 + 100) * 4 / 100 = -4, inverted to 4
    gateway.bus_mut().push(0x002, &[0xFF, 0x38]);
    gateway.run_cycle();

    let steering = &gateway.link().frames()[0];
    assert_eq!(steering.command, commands::STEERING);
    assert_eq!(steering.payload, vec![0x04, 0x00]);
}

#[test]
fn test_unknown_frame_reported() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());

    gateway.bus_mut().push(0x3FF, &[1, 2, 3]);
    assert!(matches!(
        gateway.run_cycle(),
        CycleOutcome::Completed {
            handled: Some(false),
            ..
        }
    ));
    assert_eq!(gateway.diagnostics().unknown_frames, 1);
}

#[test]
fn test_reload_resets_store_before_next_decode() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());

    gateway.bus_mut().push(0x180, &[0x44, 0x5C]);
    gateway.bus_mut().push(0x60D, &[0x01]);
    gateway.run_cycle();
    gateway.run_cycle();
    assert_eq!(gateway.state().engine_rpm(), 2500);
    assert_ne!(gateway.state().doors(), 0);

    gateway.reload(RAW_RPM_PROFILE).unwrap();
    assert_eq!(gateway.state().engine_rpm(), 0);
    assert_eq!(gateway.state().doors(), 0);
    assert_eq!(gateway.diagnostics().profile.as_deref(), Some("Raw RPM"));

    // The new profile divides raw RPM by the calibrated divisor
    gateway.bus_mut().push(0x180, &[0x44, 0x5C]);
    gateway.run_cycle();
    assert_eq!(gateway.state().engine_rpm(), 2500);

    // Door frame is no longer part of the profile
    gateway.bus_mut().push(0x60D, &[0x01]);
    gateway.run_cycle();
    assert_eq!(gateway.state().doors(), 0);
}

#[test]
fn test_reload_resends_every_channel() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());
    gateway.run_cycle();
    gateway.link_mut().clear();

    clock.advance(1);
    gateway.reload(RAW_RPM_PROFILE).unwrap();
    assert_eq!(
        gateway.run_cycle(),
        CycleOutcome::Completed {
            handled: None,
            sent: Channel::ALL.len()
        }
    );
}

#[test]
fn test_invalid_reload_keeps_profile_and_state() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());
    gateway.bus_mut().push(0x180, &[0x44, 0x5C]);
    gateway.run_cycle();

    let err = gateway
        .reload(r#"{"name": "Bad", "frames": [{"canId": "0x900", "fields": []}]}"#)
        .unwrap_err();
    assert_eq!(err, ValidationError::InvalidIdentifier("0x900".into()));

    assert_eq!(gateway.diagnostics().profile.as_deref(), Some("Nissan Juke F15"));
    assert_eq!(gateway.state().engine_rpm(), 2500);
    assert!(!gateway.is_simulated());
}

#[test]
fn test_read_errors_counted_and_output_continues() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());
    gateway.bus_mut().fail_reads = true;

    assert_eq!(
        gateway.run_cycle(),
        CycleOutcome::Completed {
            handled: None,
            sent: Channel::ALL.len()
        }
    );
    assert_eq!(gateway.diagnostics().bus_read_errors, 1);
}

#[test]
fn test_simulated_until_activated() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    assert!(gateway.is_simulated());
    assert_eq!(gateway.diagnostics().profile, None);

    gateway.bus_mut().push(0x180, &[0x44, 0x5C]);
    assert!(matches!(
        gateway.run_cycle(),
        CycleOutcome::Completed {
            handled: Some(false),
            ..
        }
    ));
    assert_eq!(gateway.state().engine_rpm(), 0);
}

#[test]
fn test_diagnostics_snapshot() {
    let clock = ManualClock::new(0);
    let restarter = RecordingRestarter::default();
    let mut gateway = common::gateway(&clock, &restarter);
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());
    gateway.bus_mut().push(0x180, &[0x44, 0x5C]);
    gateway.link_mut().push_inbound(&[0x2E, 0x90, 0x00, 0x6F]);
    gateway.run_cycle();

    clock.set(1_500);
    let diag = gateway.diagnostics();
    assert_eq!(diag.frames_processed, 1);
    assert_eq!(diag.frames_sent, Channel::ALL.len() as u64);
    assert_eq!(diag.handshake_replies, 1);
    assert_eq!(diag.silent_ms, 1_500);
    assert!(!diag.simulated);

    let summary = diag.summary();
    assert!(summary.starts_with("profile=Nissan Juke F15 processed=1"), "{summary}");

    let json = serde_json::to_value(&diag).unwrap();
    assert_eq!(json["health"], "HEALTHY");
    assert_eq!(json["bus"]["rx_errors"], 0);
}

#[test]
fn test_replay_capture_through_gateway() {
    let capture = "\
        Juke F15 bench capture\n\
        RX ID: 0x180 | DLC: 2 | Data: 44 5C\n\
        RX ID: 0x5C5 | DLC: 4 | Data: 32 01 E2 40\n\
        RX ID: 0x6F6 | DLC: 1 | Data: 8C\n";
    let bus = ReplayBus::parse(capture).unwrap();
    let clock = ManualClock::new(0);

    let mut gateway = Gateway::new(bus, MockLink::new(), Calibration::default())
        .with_clock(Box::new(clock.clone()));
    gateway.activate(profile::load(common::JUKE_PROFILE).unwrap());

    for _ in 0..3 {
        gateway.run_cycle();
        clock.advance(10);
    }

    let state = gateway.state();
    assert_eq!(state.engine_rpm(), 2500);
    assert_eq!(state.fuel_level(), 22);
    assert_eq!(state.odometer(), 123_456);
    assert!((state.voltage() - 14.0).abs() < 0.01);
    assert_eq!(gateway.diagnostics().frames_processed, 3);
}
