use std::net::TcpStream;
use std::process::ExitCode;

use clap::Parser;
use elevator_proto::{CallReply, CallRequest, Floor};

/// Call pad: request a car to carry a passenger from `src` to `dst` (spec §4.6/§6).
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Floor the passenger is waiting on.
    src: String,
    /// Floor the passenger wants to go to.
    dst: String,
    /// `host:port` of the dispatcher.
    #[arg(long, default_value = "127.0.0.1:3000")]
    dispatcher: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let src: Floor = args
        .src
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid src floor {:?}: {e}", args.src))?;
    let dst: Floor = args
        .dst
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid dst floor {:?}: {e}", args.dst))?;

    // Scenario 6: a call between equal floors is rejected here, never sent.
    if src == dst {
        anyhow::bail!("src and dst floors must differ (got {src} for both)");
    }

    let mut stream = TcpStream::connect(&args.dispatcher)
        .map_err(|e| anyhow::anyhow!("failed to connect to dispatcher at {}: {e}", args.dispatcher))?;
    let request = CallRequest { src, dst };
    elevator_proto::write_frame(&mut stream, &request.encode())?;

    let reply_frame = elevator_proto::read_frame(&mut stream)?;
    let reply = CallReply::decode(&reply_frame)?;
    match reply {
        CallReply::Car(name) => println!("CAR {name}"),
        CallReply::Unavailable => println!("UNAVAILABLE"),
    }
    Ok(())
}
