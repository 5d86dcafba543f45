use std::net::IpAddr;

use clap::Parser;

use elevator_dispatcher::{server, Config};

/// Central elevator dispatcher: accepts car registrations and call-pad requests on
/// a single fixed port (spec §6). Takes zero required arguments; the bind
/// address/port overrides exist for tests and local development, not normal
/// deployment.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to bind the dispatcher's listener to.
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// TCP port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    elevator_proto::shutdown::install();

    let args = Args::parse();
    server::run(Config {
        bind_addr: args.bind,
        port: args.port,
    })
}
