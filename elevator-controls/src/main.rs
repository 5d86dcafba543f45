use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use elevator_proto::DoorState;
use elevator_shm::CarRegion;

/// Internal controls: flip one button/sensor/mode flag on a car's shared state,
/// or move it one floor while in individual-service mode (spec §4.5/§6).
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Name of the car's shared region to operate on.
    car_name: String,
    /// Operation to apply.
    op: Op,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Op {
    Open,
    Close,
    Stop,
    ServiceOn,
    ServiceOff,
    Up,
    Down,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let region = CarRegion::open(&args.car_name).map_err(|e| {
        anyhow::anyhow!(
            "failed to open shared region for car {:?}: {e}",
            args.car_name
        )
    })?;
    let mut guard = region.lock()?;
    let payload = guard.payload_mut();

    match args.op {
        Op::Open => payload.set_open_button(true),
        Op::Close => payload.set_close_button(true),
        Op::Stop => payload.set_emergency_stop(true),
        Op::ServiceOn => payload.set_individual_service_mode(true),
        Op::ServiceOff => payload.set_individual_service_mode(false),
        Op::Up | Op::Down => {
            let stationary = payload.current_floor().ok() == payload.destination_floor().ok();
            let ready = payload.individual_service_mode()
                && payload.status().ok() == Some(DoorState::Closed)
                && stationary;
            if !ready {
                anyhow::bail!(
                    "up/down requires individual-service mode, a closed door, and a stationary car"
                );
            }
            let current = payload.current_floor()?;
            let next = match args.op {
                Op::Up => current.step_up(),
                Op::Down => current.step_down(),
                _ => unreachable!(),
            };
            let Some(next) = next else {
                anyhow::bail!("no floor in that direction from {current}");
            };
            payload.set_destination_floor(next);
        }
    }

    guard.broadcast()?;
    tracing::info!(car = %args.car_name, op = ?args.op, "applied");
    Ok(())
}
