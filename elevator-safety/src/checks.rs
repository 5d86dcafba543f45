//! The safety monitor's check sequence (spec §4.4), run atomically on every wake.

use elevator_shm::Payload;

/// Runs heartbeat refresh, obstruction handling, emergency-stop/overload latching,
/// and the consistency sweep, in that order, against a locked payload. Each step
/// re-reads `emergency_mode` so a latch set earlier in this same sweep suppresses
/// the steps that follow it, matching the "not already in emergency" guard spec §4.4
/// repeats on steps 3-5.
pub fn run_sweep(payload: &mut Payload) {
    refresh_heartbeat(payload);
    handle_obstruction(payload);
    handle_emergency_stop(payload);
    handle_overload(payload);
    check_consistency(payload);
}

/// Step 1: the monitor is the only writer that resets the heartbeat to fresh.
fn refresh_heartbeat(payload: &mut Payload) {
    if payload.safety_system != 1 {
        payload.safety_system = 1;
    }
}

/// Step 2: doors must reopen if something is in the way while closing.
fn handle_obstruction(payload: &mut Payload) {
    if payload.door_obstruction() && payload.status().ok() == Some(elevator_proto::DoorState::Closing) {
        payload.set_status(elevator_proto::DoorState::Opening);
    }
}

/// Step 3: the physical stop button latches emergency mode and self-clears.
fn handle_emergency_stop(payload: &mut Payload) {
    if payload.emergency_stop() && !payload.emergency_mode() {
        eprintln!("The emergency stop button has been pressed!");
        tracing::error!("emergency stop button pressed");
        payload.set_emergency_mode(true);
        payload.set_emergency_stop(false);
    }
}

/// Step 4: an overload trip latches emergency mode; the sensor flag is left set.
fn handle_overload(payload: &mut Payload) {
    if payload.overload() && !payload.emergency_mode() {
        eprintln!("The overload sensor has been tripped!");
        tracing::error!("overload sensor tripped");
        payload.set_emergency_mode(true);
    }
}

/// Step 5: once latched, the state is frozen and no longer consulted for safety.
fn check_consistency(payload: &mut Payload) {
    if payload.emergency_mode() {
        return;
    }
    if let Err(reason) = payload.check_consistency() {
        eprintln!("Data consistency error!");
        tracing::error!(%reason, "data consistency error");
        payload.set_emergency_mode(true);
    }
}
