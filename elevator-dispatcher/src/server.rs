//! The accept loop (spec §4.6/§5): a single `TcpListener`, a bounded connection-slot
//! pool, and one `std::thread::spawn` worker per accepted connection.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use elevator_proto::limits::MAX_CONNECTIONS;

use crate::connection;
use crate::registry::Registry;

/// How often the accept loop polls for shutdown while no connection is pending.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
        }
    }
}

/// Runs the dispatcher's accept loop until a `SIGINT` is observed (spec §5
/// "cancellation and shutdown"). Each accepted connection is handed to its own
/// worker thread; the connection-slot pool rejects new connections once
/// [`MAX_CONNECTIONS`] is reached.
pub fn run(config: Config) -> anyhow::Result<()> {
    serve(bind(&config)?)
}

/// Binds the listening socket without serving it, so a caller (tests, in
/// particular) can learn the actual bound address before handing it to [`serve`].
pub fn bind(config: &Config) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind((config.bind_addr, config.port))?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Serves accepted connections on an already-bound listener until shutdown.
pub fn serve(listener: TcpListener) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "dispatcher listening");

    let registry = Arc::new(Registry::new());
    let in_flight = Arc::new(AtomicUsize::new(0));

    while !elevator_proto::shutdown::requested() {
        match listener.accept() {
            Ok((stream, peer)) => {
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                let acquired = in_flight
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        (n < MAX_CONNECTIONS).then_some(n + 1)
                    })
                    .is_ok();
                if !acquired {
                    tracing::warn!(%peer, "connection pool full, rejecting");
                    continue;
                }

                let registry = Arc::clone(&registry);
                let in_flight = Arc::clone(&in_flight);
                thread::spawn(move || {
                    connection::handle(stream, &registry);
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                });
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!("dispatcher shutting down");
    Ok(())
}
