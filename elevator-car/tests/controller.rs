//! End-to-end test running the real car controller, a real dispatcher, and a
//! real safety monitor against one shared memory region (spec §8 scenario 3).

use std::net::{IpAddr, Ipv4Addr};
use std::thread;
use std::time::{Duration, Instant};

use elevator_car::{run, Config};
use elevator_dispatcher::server;
use elevator_proto::{DoorState, Floor};
use elevator_shm::CarRegion;

fn unique_name(test: &str) -> String {
    format!("test-car-{test}-{}", std::process::id())
}

fn wait_for_status(region: &CarRegion, want: DoorState, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        {
            let guard = region.lock().unwrap();
            if guard.payload().status().ok() == Some(want) {
                return;
            }
        }
        if Instant::now() > deadline {
            let guard = region.lock().unwrap();
            panic!(
                "timed out waiting for status {want:?}; current={:?} open_button={} safety_system={} emergency={}",
                guard.payload().status(),
                guard.payload().open_button(),
                guard.payload().safety_system,
                guard.payload().emergency_mode(),
            );
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn door_sequence_runs_end_to_end() {
    let listener = server::bind(&server::Config {
        bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    })
    .unwrap();
    let dispatcher_addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let _ = server::serve(listener);
    });

    let name = unique_name("door-timing");
    let lo = Floor::new(1).unwrap();
    let hi = Floor::new(4).unwrap();
    // Comfortably larger than the safety monitor's own 100ms poll interval, so
    // a scheduling hiccup can never make the heartbeat escalate to emergency
    // before the monitor gets a chance to refresh it.
    let tick = Duration::from_millis(150);
    {
        let name = name.clone();
        let dispatcher_addr = dispatcher_addr.to_string();
        thread::spawn(move || {
            let _ = run(Config {
                name,
                lo,
                hi,
                tick,
                dispatcher_addr,
            });
        });
    }

    // Give the car controller time to create the region before anything else
    // (in particular the safety monitor, which only opens an existing region
    // and exits immediately if there isn't one yet) attaches to it.
    thread::sleep(Duration::from_millis(100));
    let region = CarRegion::open(&name).expect("car controller should have created its region");

    {
        let name = name.clone();
        thread::spawn(move || {
            let _ = elevator_safety::run(&name);
        });
    }

    // Wait for the safety monitor to mark the heartbeat fresh and the car to
    // finish connecting, then press the open button at the car's own floor.
    thread::sleep(Duration::from_millis(300));
    {
        let mut guard = region.lock().unwrap();
        assert_eq!(guard.payload().status().unwrap(), DoorState::Closed);
        assert!(!guard.payload().emergency_mode());
        guard.payload_mut().set_open_button(true);
        guard.broadcast().unwrap();
    }

    let settle = Duration::from_millis(700);
    wait_for_status(&region, DoorState::Opening, settle);
    wait_for_status(&region, DoorState::Open, settle);
    wait_for_status(&region, DoorState::Closing, settle);
    wait_for_status(&region, DoorState::Closed, settle);
}
