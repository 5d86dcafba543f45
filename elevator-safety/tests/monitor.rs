//! Integration tests driving the real safety monitor loop against a shared
//! memory region (spec §8 scenarios 4 and 5).

use std::thread;
use std::time::Duration;

use elevator_proto::DoorState;
use elevator_shm::CarRegion;

fn unique_name(test: &str) -> String {
    format!("test-safety-{test}-{}", std::process::id())
}

/// The monitor's own poll interval is 100ms; tests allow a few multiples of
/// that before concluding a check never landed.
const SETTLE: Duration = Duration::from_millis(500);

#[test]
fn obstruction_reopens_while_closing() {
    let name = unique_name("obstruction");
    let region = CarRegion::create_or_open(&name).unwrap();
    {
        let name = name.clone();
        thread::spawn(move || elevator_safety::run(&name));
    }
    thread::sleep(Duration::from_millis(50));

    {
        let mut guard = region.lock().unwrap();
        guard.payload_mut().set_status(DoorState::Closing);
        guard.payload_mut().set_door_obstruction(true);
        guard.broadcast().unwrap();
    }

    thread::sleep(SETTLE);
    let guard = region.lock().unwrap();
    assert_eq!(guard.payload().status().unwrap(), DoorState::Opening);
}

#[test]
fn emergency_stop_latches_and_survives_button_clear() {
    let name = unique_name("emergency");
    let region = CarRegion::create_or_open(&name).unwrap();
    {
        let name = name.clone();
        thread::spawn(move || elevator_safety::run(&name));
    }
    thread::sleep(Duration::from_millis(50));

    {
        let mut guard = region.lock().unwrap();
        guard.payload_mut().set_emergency_stop(true);
        guard.broadcast().unwrap();
    }

    thread::sleep(SETTLE);
    {
        let guard = region.lock().unwrap();
        assert!(guard.payload().emergency_mode());
        assert!(!guard.payload().emergency_stop());
    }

    // Clearing the stop button (it already cleared itself) does not clear
    // emergency_mode; it is monotonically latched.
    thread::sleep(SETTLE);
    let guard = region.lock().unwrap();
    assert!(guard.payload().emergency_mode());
}
