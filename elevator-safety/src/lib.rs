//! Independent safety monitor (spec §4.4): one process per car, observing the
//! shared car state region and latching emergency mode on any anomaly.

pub mod checks;

use std::time::Duration;

use elevator_shm::CarRegion;

/// How long each condition-variable wait blocks before the loop re-checks the
/// shutdown flag. Every wake — real or timed-out — runs the same check sequence,
/// which is idempotent, so polling for shutdown costs nothing extra in behavior.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backoff after a mutex/condvar failure (spec §4.4 "escalate to emergency and back
/// off briefly").
const FAILURE_BACKOFF: Duration = Duration::from_millis(200);

/// The monitor's entry point (spec §4.4). Opens the named region — which must
/// already exist, created by the car controller or another collaborator — and loops
/// running the check sequence on every wake until a `SIGINT` is observed.
pub fn run(car_name: &str) -> anyhow::Result<()> {
    let region = CarRegion::open(car_name)
        .map_err(|e| anyhow::anyhow!("failed to open shared region for car {car_name:?}: {e}"))?;
    tracing::info!(car = car_name, "safety monitor attached");

    let mut guard = region.lock()?;
    while !elevator_proto::shutdown::requested() {
        let (next_guard, _timed_out) = match guard.wait_timeout(POLL_INTERVAL) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, "condition wait failed, escalating to emergency");
                let mut escalated = region.lock()?;
                escalated.payload_mut().set_emergency_mode(true);
                let _ = escalated.broadcast();
                drop(escalated);
                std::thread::sleep(FAILURE_BACKOFF);
                guard = region.lock()?;
                continue;
            }
        };
        guard = next_guard;
        checks::run_sweep(guard.payload_mut());
        guard.broadcast()?;
    }

    tracing::info!(car = car_name, "safety monitor shutting down");
    Ok(())
}
