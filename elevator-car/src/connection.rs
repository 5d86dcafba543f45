//! The dispatcher link (spec §4.5/§5): a single `TcpStream`, shared between the
//! dispatcher task that owns it and the operations task that publishes `STATUS`
//! over it, guarded by a private mutex so the two tasks never write concurrently.

use std::net::TcpStream;
use std::sync::Mutex;

use elevator_proto::{CarToDispatcher, DoorState, Floor};

/// Holds the current connection, if any. `None` means disconnected; the
/// dispatcher task is the only one that ever fills it back in.
pub struct Connection {
    stream: Mutex<Option<TcpStream>>,
}

impl Connection {
    pub fn new() -> Self {
        Connection {
            stream: Mutex::new(None),
        }
    }

    pub fn set(&self, stream: TcpStream) {
        *self.stream.lock().unwrap() = Some(stream);
    }

    pub fn clear(&self) {
        *self.stream.lock().unwrap() = None;
    }

    pub fn is_connected(&self) -> bool {
        self.stream.lock().unwrap().is_some()
    }

    /// Sends `msg` and immediately drops the connection, for the one-shot
    /// `INDIVIDUAL SERVICE`/`EMERGENCY` notices (spec §4.5: "sent once, immediately
    /// before close"). A write failure is not reported; the connection is already
    /// being torn down either way.
    pub fn send_and_close(&self, msg: CarToDispatcher) {
        let mut guard = self.stream.lock().unwrap();
        if let Some(stream) = guard.as_mut() {
            let _ = elevator_proto::write_frame(stream, &msg.encode());
        }
        *guard = None;
    }

    /// Publishes one `STATUS` frame, if currently connected. Write errors are
    /// swallowed: the connection is dropped, and the dispatcher task reconnects
    /// and resends on its own next tick (spec §4.5 "connection loop").
    pub fn publish_status(&self, state: DoorState, current: Floor, destination: Floor) {
        let mut guard = self.stream.lock().unwrap();
        let Some(stream) = guard.as_mut() else {
            return;
        };
        let msg = CarToDispatcher::Status {
            state,
            current,
            destination,
        };
        if elevator_proto::write_frame(stream, &msg.encode()).is_err() {
            *guard = None;
        }
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}
