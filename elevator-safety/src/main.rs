use clap::Parser;

/// Independent safety monitor for one elevator car (spec §4.4/§6).
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Name of the car whose shared region to monitor.
    car_name: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    elevator_proto::shutdown::install();

    let args = Args::parse();
    elevator_safety::run(&args.car_name)
}
