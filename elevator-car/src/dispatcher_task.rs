//! The dispatcher task (spec §4.5): waits out stale heartbeats and special modes,
//! maintains the TCP link to the dispatcher, and applies the one message the
//! dispatcher ever sends a car.

use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use elevator_proto::{CarToDispatcher, DispatcherToCar, Floor, ProtoError};
use elevator_shm::CarRegion;

use crate::connection::Connection;

/// How long a condition wait blocks while the car is stale/special-mode, before
/// re-checking for shutdown (spec §5 cancellation).
const WAIT_POLL: Duration = Duration::from_millis(200);

/// Connects to the dispatcher, resolving `addr` with [`ToSocketAddrs`] and trying
/// each candidate in turn (spec §9 "IPv6 fallback"), then registers this car.
fn connect(addr: &str, name: &str, lo: Floor, hi: Floor) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect(candidate) {
            Ok(mut stream) => {
                let msg = CarToDispatcher::Register {
                    name: name.to_owned(),
                    lo,
                    hi,
                };
                elevator_proto::write_frame(&mut stream, &msg.encode())
                    .map_err(proto_to_io)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::new(ErrorKind::NotFound, "no addresses resolved")))
}

fn proto_to_io(e: ProtoError) -> std::io::Error {
    std::io::Error::other(e)
}

/// Runs the dispatcher task to completion (until shutdown is requested).
#[allow(clippy::too_many_arguments)]
pub fn run(
    region: Arc<CarRegion>,
    conn: Arc<Connection>,
    dest_changed: Arc<AtomicBool>,
    name: String,
    lo: Floor,
    hi: Floor,
    dispatcher_addr: String,
    tick: Duration,
) {
    let mut read_half: Option<TcpStream> = None;

    while !elevator_proto::shutdown::requested() {
        let ready = match region.lock() {
            Ok(guard) => {
                let p = guard.payload();
                p.safety_system == 1 && !p.individual_service_mode() && !p.emergency_mode()
            }
            Err(_) => return,
        };

        if !ready {
            if read_half.take().is_some() {
                conn.clear();
            }
            let Ok(guard) = region.lock() else { return };
            let _ = guard.wait_timeout(WAIT_POLL);
            continue;
        }

        if read_half.is_none() {
            match connect(&dispatcher_addr, &name, lo, hi) {
                Ok(stream) => {
                    let clone = match stream.try_clone() {
                        Ok(c) => c,
                        Err(_) => continue,
                    };
                    conn.set(stream);
                    publish_current_status(&region, &conn);
                    read_half = Some(clone);
                }
                Err(e) => {
                    tracing::warn!(car = %name, error = %e, "dispatcher connection failed, retrying");
                    std::thread::sleep(tick);
                    continue;
                }
            }
        }

        let stream = read_half.as_mut().expect("just ensured Some");
        if stream.set_read_timeout(Some(tick)).is_err() {
            read_half = None;
            conn.clear();
            continue;
        }

        match elevator_proto::read_frame(stream) {
            Ok(frame) => match DispatcherToCar::decode(&frame) {
                Ok(DispatcherToCar { floor })
                    if floor.get() >= lo.get() && floor.get() <= hi.get() =>
                {
                    if let Ok(mut guard) = region.lock() {
                        guard.payload_mut().set_destination_floor(floor);
                        dest_changed.store(true, Ordering::SeqCst);
                        let _ = guard.broadcast();
                    }
                }
                _ => {
                    read_half = None;
                    conn.clear();
                }
            },
            Err(ProtoError::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(_) => {
                read_half = None;
                conn.clear();
            }
        }
    }
}

fn publish_current_status(region: &CarRegion, conn: &Connection) {
    let Ok(guard) = region.lock() else { return };
    let payload = guard.payload();
    let (Ok(state), Ok(current), Ok(destination)) = (
        payload.status(),
        payload.current_floor(),
        payload.destination_floor(),
    ) else {
        return;
    };
    drop(guard);
    conn.publish_status(state, current, destination);
}
