use std::thread;
use std::time::Duration;

use elevator_proto::{DoorState, Floor};
use elevator_shm::CarRegion;

fn unique_name(test: &str) -> String {
    format!("test-{test}-{}", std::process::id())
}

#[test]
fn create_then_open_share_state() {
    let name = unique_name("create-open");
    let creator = CarRegion::create_or_open(&name).unwrap();
    {
        let mut guard = creator.lock().unwrap();
        guard.payload_mut().set_current_floor(Floor::new(3).unwrap());
        guard.broadcast().unwrap();
    }

    let opener = CarRegion::open(&name).unwrap();
    let guard = opener.lock().unwrap();
    assert_eq!(guard.payload().current_floor().unwrap().get(), 3);
}

#[test]
fn broadcast_wakes_a_waiting_thread() {
    let name = unique_name("broadcast");
    let region = CarRegion::create_or_open(&name).unwrap();

    let waiter = {
        let name = name.clone();
        thread::spawn(move || {
            let region = CarRegion::open(&name).unwrap();
            let mut guard = region.lock().unwrap();
            while !guard.payload().emergency_stop() {
                guard = guard.wait().unwrap();
            }
            guard.payload().emergency_mode()
        })
    };

    thread::sleep(Duration::from_millis(20));
    {
        let mut guard = region.lock().unwrap();
        guard.payload_mut().set_emergency_stop(true);
        guard.payload_mut().set_emergency_mode(true);
        guard.broadcast().unwrap();
    }

    assert!(waiter.join().unwrap());
}

#[test]
fn wait_timeout_reports_elapsed() {
    let name = unique_name("timeout");
    let region = CarRegion::create_or_open(&name).unwrap();
    let guard = region.lock().unwrap();
    let (_, timed_out) = guard.wait_timeout(Duration::from_millis(20)).unwrap();
    assert!(timed_out);
}

#[test]
fn default_state_matches_spec() {
    let name = unique_name("defaults");
    let region = CarRegion::create_or_open(&name).unwrap();
    let guard = region.lock().unwrap();
    assert_eq!(guard.payload().current_floor().unwrap().get(), 1);
    assert_eq!(guard.payload().destination_floor().unwrap().get(), 1);
    assert_eq!(guard.payload().status().unwrap(), DoorState::Closed);
    assert!(guard.payload().check_consistency().is_ok());
}
