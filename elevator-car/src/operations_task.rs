//! The operations task (spec §4.5): drives the door/motion state machine in real
//! time, advances the safety heartbeat, and reports mode transitions to the
//! dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use elevator_proto::CarToDispatcher;
use elevator_shm::{CarRegion, Payload};

use crate::connection::Connection;
use crate::fsm::Fsm;

/// The state machine is stepped at a finer grain than `tick` so door-phase and
/// button presses feel responsive; the heartbeat still only advances once per
/// full `tick`.
fn poll_interval(tick: Duration) -> Duration {
    (tick / 10).max(Duration::from_millis(2))
}

pub fn run(
    region: Arc<CarRegion>,
    conn: Arc<Connection>,
    dest_changed: Arc<AtomicBool>,
    tick: Duration,
    mut fsm: Fsm,
) {
    let poll = poll_interval(tick);
    let mut since_heartbeat = Duration::ZERO;
    let mut was_emergency = false;
    let mut was_individual_service = false;

    while !elevator_proto::shutdown::requested() {
        std::thread::sleep(poll);

        let mut guard = match region.lock() {
            Ok(g) => g,
            Err(_) => return,
        };

        since_heartbeat += poll;
        let mut changed = false;
        if since_heartbeat >= tick {
            since_heartbeat = Duration::ZERO;
            changed |= advance_heartbeat(guard.payload_mut());
        }

        let emergency = guard.payload().emergency_mode();
        let individual_service = guard.payload().individual_service_mode();

        // Mode transitions are reported to the dispatcher regardless of what
        // caused them — a heartbeat escalation above, or an external write via
        // the internal-controls tool or the safety monitor (spec §4.5).
        if emergency && !was_emergency {
            drop(guard);
            conn.send_and_close(CarToDispatcher::Emergency);
            guard = match region.lock() {
                Ok(g) => g,
                Err(_) => return,
            };
        }
        was_emergency = emergency;

        if individual_service && !was_individual_service && !emergency {
            drop(guard);
            conn.send_and_close(CarToDispatcher::IndividualService);
            guard = match region.lock() {
                Ok(g) => g,
                Err(_) => return,
            };
        }
        was_individual_service = individual_service;

        if emergency {
            if changed {
                let _ = guard.broadcast();
            }
            continue;
        }

        let mut local_dest_changed = dest_changed.load(Ordering::SeqCst);
        let stepped = fsm.step(
            guard.payload_mut(),
            individual_service,
            &mut local_dest_changed,
            poll,
        );
        dest_changed.store(local_dest_changed, Ordering::SeqCst);
        changed |= stepped;

        if changed {
            let _ = guard.broadcast();
        }

        if stepped {
            let payload = guard.payload();
            let published = match (
                payload.status(),
                payload.current_floor(),
                payload.destination_floor(),
            ) {
                (Ok(state), Ok(current), Ok(destination)) => Some((state, current, destination)),
                _ => None,
            };
            drop(guard);
            if let Some((state, current, destination)) = published {
                conn.publish_status(state, current, destination);
            }
        }
    }
}

/// `1 → 2 → 3 → emergency` (spec §4.5): the safety monitor is the only writer
/// that ever resets this back to `1`; if it hasn't, this car controller is the one
/// that drives it forward and eventually latches `emergency_mode`.
fn advance_heartbeat(payload: &mut Payload) -> bool {
    match payload.safety_system {
        0 | 1 => {
            payload.safety_system = 2;
            false
        }
        2 => {
            payload.safety_system = 3;
            false
        }
        _ => {
            if payload.emergency_mode() {
                false
            } else {
                payload.set_emergency_mode(true);
                true
            }
        }
    }
}
