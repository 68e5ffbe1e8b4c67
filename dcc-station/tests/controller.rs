use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dcc_core::{timing::TimingConfig, Direction, Packet};
use dcc_driver::DummyDriver;
use dcc_station::config::{self, SchedulerConfig};
use dcc_station::{Controller, Locomotive};

/// Keeps the test suite fast: a handful of microseconds per bit half and a
/// short packet separation, well within the NMRA-legal ranges.
fn configure_fast_timing() {
    dcc_core::timing::configure(TimingConfig {
        bit_one_us: 55,
        bit_zero_us: 95,
        packet_separation_ms: 5,
        preamble_bits: 14,
        headlight_compat: false,
    });
    config::configure(SchedulerConfig {
        command_max_queue: 3,
        command_repeat: 2,
    });
}

#[test]
fn add_get_list_remove_round_trip() {
    let driver = Arc::new(DummyDriver::default());
    let controller = Controller::new(driver);

    assert!(controller.get("Thomas").is_none());

    let loco = Locomotive::new("Thomas", 3, 10, Direction::Forward, true, false, false, false, false);
    controller.add(loco);

    let fetched = controller.get("Thomas").expect("should be tracked");
    assert_eq!(fetched.address(), 3);
    assert_eq!(fetched.speed(), 10);

    assert_eq!(controller.list().len(), 1);

    // list() must be an independent snapshot.
    let mut snapshot = controller.list();
    snapshot.clear();
    assert_eq!(controller.list().len(), 1);

    controller.remove("Thomas");
    assert!(controller.get("Thomas").is_none());
    // removing again is a no-op, not an error
    controller.remove("Thomas");
}

#[test]
fn adding_same_name_replaces_entry() {
    let driver = Arc::new(DummyDriver::default());
    let controller = Controller::new(driver);

    controller.add(Locomotive::new("Gordon", 4, 5, Direction::Forward, false, false, false, false, false));
    controller.add(Locomotive::new("Gordon", 4, 25, Direction::Backward, true, true, false, false, false));

    assert_eq!(controller.list().len(), 1);
    let loco = controller.get("Gordon").unwrap();
    assert_eq!(loco.speed(), 25);
    assert_eq!(loco.direction(), Direction::Backward);
}

#[test]
fn command_before_start_sends_inline() {
    configure_fast_timing();
    let driver = Arc::new(DummyDriver::default());
    let controller = Controller::new(driver.clone());

    let packet = Packet::generic(Some(driver.clone() as _), 0x01, vec![0x02]);
    controller.command(packet);

    assert!(!driver.buffer().is_empty());
}

#[test]
fn stop_is_idempotent_when_never_started() {
    let driver = Arc::new(DummyDriver::default());
    let controller = Controller::new(driver);
    controller.stop();
    controller.stop();
}

#[test]
fn run_loop_emits_idle_on_empty_registry_and_stops_cleanly() {
    configure_fast_timing();
    let driver = Arc::new(DummyDriver::default());
    let controller = Controller::new(driver.clone());

    controller.start();
    thread::sleep(Duration::from_millis(50));
    controller.stop();

    // The idle packet and the broadcast-stop packet must both have put
    // something on the wire.
    assert!(!driver.buffer().is_empty());

    // stop() a second time is a no-op and must not block.
    controller.stop();
}

#[test]
fn start_while_running_is_a_defensive_noop() {
    configure_fast_timing();
    let driver = Arc::new(DummyDriver::default());
    let controller = Controller::new(driver);

    controller.start();
    controller.start(); // must not panic, deadlock, or spawn a second loop
    thread::sleep(Duration::from_millis(20));
    controller.stop();
}

#[test]
fn registry_mutation_is_visible_to_run_loop() {
    configure_fast_timing();
    let driver = Arc::new(DummyDriver::default());
    let controller = Controller::new(driver.clone());

    controller.start();
    controller.add(Locomotive::new("Percy", 2, 20, Direction::Forward, true, false, false, false, false));
    thread::sleep(Duration::from_millis(50));
    controller.stop();

    assert!(!driver.buffer().is_empty());
}
