//! The door/motion state machine (spec §4.5): pure logic over the shared payload,
//! driven by repeated calls to [`Fsm::step`] with the elapsed time since the
//! previous call. Kept free of sockets and real clocks so it is unit-testable with
//! synthetic tick durations instead of real sleeps.

use std::time::Duration;

use elevator_proto::floor::Direction;
use elevator_proto::{DoorState, Floor};
use elevator_shm::Payload;

/// Door/motion state machine for one car. `tick_period` is the controller's `T`;
/// `lo`/`hi` are the car's serviceable range, used only to reject out-of-range
/// individual-service destinations (spec §4.5).
pub struct Fsm {
    tick_period: Duration,
    lo: Floor,
    hi: Floor,
    /// Time spent in the current `status` since it was last entered.
    elapsed_in_phase: Duration,
    /// Time since the current door-open sequence's `t0` (valid during
    /// Opening/Open/Closing; spec §4.5's absolute-time schedule).
    door_root_elapsed: Duration,
    last_status: Option<DoorState>,
}

impl Fsm {
    pub fn new(tick_period: Duration, lo: Floor, hi: Floor) -> Self {
        Fsm {
            tick_period,
            lo,
            hi,
            elapsed_in_phase: Duration::ZERO,
            door_root_elapsed: Duration::ZERO,
            last_status: None,
        }
    }

    /// Advances the FSM by `dt` of wall-clock time, applying at most one
    /// transition. Returns `true` if `payload` changed observably (the caller
    /// should broadcast the condition variable and publish `STATUS`).
    ///
    /// A status that differs from what this FSM last saw — whether because this
    /// call itself just changed it, or because another process did (the safety
    /// monitor reopening the door, a forced stop) — is treated as a fresh entry
    /// into that phase starting now. This is what gives every scheduled
    /// transition below its "only fire if we're still in the phase we expect"
    /// guard (spec §4.5) for free.
    pub fn step(
        &mut self,
        payload: &mut Payload,
        individual_service: bool,
        dest_changed: &mut bool,
        dt: Duration,
    ) -> bool {
        let status = payload.status().unwrap_or(DoorState::Closed);
        if Some(status) != self.last_status {
            // A status change this FSM didn't just decide on its own previous call
            // is still "fresh" from its point of view: either this call's dispatch
            // is about to cause it, or another process changed it between calls.
            // Either way, this tick's `dt` belongs to the phase being entered.
            self.last_status = Some(status);
            self.elapsed_in_phase = dt;
            match status {
                // A brand new door-open sequence starts its own clock...
                DoorState::Opening => self.door_root_elapsed = dt,
                // ...but Open/Closing continue the same sequence's clock.
                DoorState::Open | DoorState::Closing => self.door_root_elapsed += dt,
                DoorState::Closed | DoorState::Between => {}
            }
        } else {
            self.elapsed_in_phase += dt;
            if matches!(
                status,
                DoorState::Opening | DoorState::Open | DoorState::Closing
            ) {
                self.door_root_elapsed += dt;
            }
        }

        match status {
            DoorState::Closed => self.step_closed(payload, individual_service, dest_changed),
            DoorState::Between => self.step_between(payload, individual_service),
            DoorState::Opening => self.step_opening(payload),
            DoorState::Open => self.step_open(payload),
            DoorState::Closing => self.step_closing(payload),
        }
    }

    fn step_closed(
        &mut self,
        payload: &mut Payload,
        individual_service: bool,
        dest_changed: &mut bool,
    ) -> bool {
        if payload.open_button() {
            let same_floor = payload.current_floor().ok() == payload.destination_floor().ok();
            if individual_service || same_floor {
                payload.set_open_button(false);
                begin_door_sequence(payload);
                return true;
            }
        }

        let (Ok(current), Ok(destination)) =
            (payload.current_floor(), payload.destination_floor())
        else {
            return false;
        };

        if individual_service {
            if destination.get() < self.lo.get() || destination.get() > self.hi.get() {
                payload.set_destination_floor(current);
                return false;
            }
            if current != destination {
                payload.set_status(DoorState::Between);
                return true;
            }
            return false;
        }

        if current != destination {
            payload.set_status(DoorState::Between);
            true
        } else if *dest_changed {
            *dest_changed = false;
            begin_door_sequence(payload);
            true
        } else {
            false
        }
    }

    fn step_between(&mut self, payload: &mut Payload, individual_service: bool) -> bool {
        if self.elapsed_in_phase < self.tick_period {
            return false;
        }
        self.elapsed_in_phase = Duration::ZERO;

        let (Ok(current), Ok(destination)) =
            (payload.current_floor(), payload.destination_floor())
        else {
            return false;
        };
        let next = match current.direction_to(destination) {
            Direction::Up => current.step_up(),
            Direction::Down => current.step_down(),
            Direction::Idle => None,
        };
        if let Some(next_floor) = next {
            payload.set_current_floor(next_floor);
        }

        let arrived = payload.current_floor().ok() == payload.destination_floor().ok();
        if arrived {
            if individual_service {
                payload.set_status(DoorState::Closed);
            } else {
                begin_door_sequence(payload);
            }
        }
        true
    }

    fn step_opening(&mut self, payload: &mut Payload) -> bool {
        if self.elapsed_in_phase < self.tick_period {
            return false;
        }
        payload.set_status(DoorState::Open);
        true
    }

    fn step_open(&mut self, payload: &mut Payload) -> bool {
        let close_pressed = payload.close_button();
        if close_pressed || self.door_root_elapsed >= 2 * self.tick_period {
            if close_pressed {
                payload.set_close_button(false);
            }
            payload.set_status(DoorState::Closing);
            return true;
        }
        false
    }

    fn step_closing(&mut self, payload: &mut Payload) -> bool {
        if self.elapsed_in_phase < self.tick_period {
            return false;
        }
        payload.set_status(DoorState::Closed);
        true
    }
}

fn begin_door_sequence(payload: &mut Payload) {
    payload.set_status(DoorState::Opening);
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(100);

    fn payload_at(current: i32, destination: i32, status: DoorState) -> Payload {
        let mut p = Payload {
            current_floor: [0; 4],
            destination_floor: [0; 4],
            status: [0; 8],
            open_button: 0,
            close_button: 0,
            door_obstruction: 0,
            overload: 0,
            emergency_stop: 0,
            individual_service_mode: 0,
            emergency_mode: 0,
            safety_system: 0,
        };
        p.set_current_floor(Floor::new(current).unwrap());
        p.set_destination_floor(Floor::new(destination).unwrap());
        p.set_status(status);
        p
    }

    fn range() -> (Floor, Floor) {
        (Floor::new(1).unwrap(), Floor::new(10).unwrap())
    }

    #[test]
    fn door_sequence_timing_matches_absolute_schedule() {
        // Arrived and Closed with a pending destination-changed flag: Opening at
        // t=0, Open at t=T, Closing at t=2T (no close_button press), Closed at t=3T.
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(3, 3, DoorState::Closed);
        let mut dest_changed = true;

        assert!(fsm.step(&mut p, false, &mut dest_changed, Duration::ZERO));
        assert_eq!(p.status().unwrap(), DoorState::Opening);

        assert!(!fsm.step(&mut p, false, &mut false, T / 2));
        assert!(fsm.step(&mut p, false, &mut false, T / 2));
        assert_eq!(p.status().unwrap(), DoorState::Open);

        assert!(!fsm.step(&mut p, false, &mut false, T - Duration::from_millis(1)));
        assert!(fsm.step(&mut p, false, &mut false, Duration::from_millis(1)));
        assert_eq!(p.status().unwrap(), DoorState::Closing);

        assert!(!fsm.step(&mut p, false, &mut false, T - Duration::from_millis(1)));
        assert!(fsm.step(&mut p, false, &mut false, Duration::from_millis(1)));
        assert_eq!(p.status().unwrap(), DoorState::Closed);
    }

    #[test]
    fn close_button_shortens_open_phase() {
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(3, 3, DoorState::Closed);
        fsm.step(&mut p, false, &mut true, Duration::ZERO); // -> Opening
        fsm.step(&mut p, false, &mut false, T); // -> Open
        assert_eq!(p.status().unwrap(), DoorState::Open);

        p.set_close_button(true);
        assert!(fsm.step(&mut p, false, &mut false, Duration::from_millis(5)));
        assert_eq!(p.status().unwrap(), DoorState::Closing);
        assert!(!p.close_button());
    }

    #[test]
    fn travel_steps_one_floor_per_tick() {
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(1, 3, DoorState::Closed);
        let mut dest_changed = false;

        assert!(fsm.step(&mut p, false, &mut dest_changed, Duration::ZERO));
        assert_eq!(p.status().unwrap(), DoorState::Between);

        assert!(fsm.step(&mut p, false, &mut dest_changed, T));
        assert_eq!(p.current_floor().unwrap().get(), 2);
        assert_eq!(p.status().unwrap(), DoorState::Between);

        assert!(fsm.step(&mut p, false, &mut dest_changed, T));
        assert_eq!(p.current_floor().unwrap().get(), 3);
        assert_eq!(p.status().unwrap(), DoorState::Opening);
    }

    #[test]
    fn travel_skips_floor_zero() {
        let (lo, hi) = (Floor::new(-5).unwrap(), Floor::new(5).unwrap());
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(-1, 2, DoorState::Between);
        fsm.step(&mut p, false, &mut false, T);
        assert_eq!(p.current_floor().unwrap().get(), 1);
    }

    #[test]
    fn individual_service_lands_closed_without_door_sequence() {
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(4, 5, DoorState::Between);
        fsm.step(&mut p, true, &mut false, T);
        assert_eq!(p.current_floor().unwrap().get(), 5);
        assert_eq!(p.status().unwrap(), DoorState::Closed);
    }

    #[test]
    fn individual_service_open_button_ignores_destination_mismatch() {
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(4, 7, DoorState::Closed);
        p.set_open_button(true);
        assert!(fsm.step(&mut p, true, &mut false, Duration::ZERO));
        assert_eq!(p.status().unwrap(), DoorState::Opening);
    }

    #[test]
    fn normal_mode_open_button_ignored_when_destination_differs() {
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(4, 7, DoorState::Closed);
        p.set_open_button(true);
        assert!(fsm.step(&mut p, false, &mut false, Duration::ZERO));
        assert_eq!(p.status().unwrap(), DoorState::Between);
        assert!(p.open_button(), "mere travel does not consume the press");
    }

    #[test]
    fn out_of_range_individual_service_destination_snaps_back() {
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(4, 40, DoorState::Closed);
        assert!(!fsm.step(&mut p, true, &mut false, Duration::ZERO));
        assert_eq!(p.destination_floor().unwrap().get(), 4);
        assert_eq!(p.status().unwrap(), DoorState::Closed);
    }

    #[test]
    fn external_reopen_restarts_door_sequence_from_opening() {
        let (lo, hi) = range();
        let mut fsm = Fsm::new(T, lo, hi);
        let mut p = payload_at(3, 3, DoorState::Closing);
        fsm.step(&mut p, false, &mut false, Duration::ZERO); // fsm thinks we're closing

        // the safety monitor reopens the door out from under us.
        p.set_status(DoorState::Opening);
        assert!(!fsm.step(&mut p, false, &mut false, T / 2));
        assert!(fsm.step(&mut p, false, &mut false, T / 2));
        assert_eq!(p.status().unwrap(), DoorState::Open);
    }
}
