use std::time::Duration;

use clap::Parser;
use elevator_proto::Floor;

/// Per-car controller: door/motion state machine, dispatcher link, safety heartbeat
/// (spec §4.5/§6).
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Name of this car's shared region (`/car<name>`) and dispatcher registration.
    name: String,
    /// Lowest serviceable floor label (e.g. `B3`, `1`).
    lo: String,
    /// Highest serviceable floor label.
    hi: String,
    /// Tick period in milliseconds, driving door timing and floor-to-floor travel.
    delay_ms: u64,
    /// `host:port` of the dispatcher.
    #[arg(long, default_value = "127.0.0.1:3000")]
    dispatcher: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    elevator_proto::shutdown::install();

    let args = Args::parse();
    let lo: Floor = args
        .lo
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid lo floor {:?}: {e}", args.lo))?;
    let hi: Floor = args
        .hi
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid hi floor {:?}: {e}", args.hi))?;

    elevator_car::run(elevator_car::Config {
        name: args.name,
        lo,
        hi,
        tick: Duration::from_millis(args.delay_ms),
        dispatcher_addr: args.dispatcher,
    })
}
