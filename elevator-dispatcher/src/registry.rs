//! The car registry (spec §3/§4.6): one slot per connected car, guarded by a single
//! mutex shared by the accept loop's per-connection workers.

use std::net::TcpStream;
use std::sync::Mutex;

use elevator_proto::limits::{MAX_CARS, MAX_QUEUE_DEPTH};
use elevator_proto::{DoorState, Floor};

/// One registered car: its identity, its last-reported state, and its stop queue.
pub struct CarEntry {
    pub name: String,
    pub lo: Floor,
    pub hi: Floor,
    pub current_floor: Floor,
    /// `None` until the car's first `STATUS` update arrives (spec §4.6: `status="Unknown"`).
    pub status: Option<DoorState>,
    pub queue: Vec<i32>,
    stream: TcpStream,
}

impl CarEntry {
    pub fn can_reach(&self, floor: Floor) -> bool {
        floor.get() >= self.lo.get() && floor.get() <= self.hi.get()
    }

    /// The floor used as the routing origin for the scheduler: the car's last
    /// reported position, unless it is mid-leg (`Closing`/`Between`), in which case
    /// the queue head stands in for "where it's heading" (spec §4.6).
    pub fn routing_origin(&self) -> i32 {
        match (self.status, self.queue.first()) {
            (Some(DoorState::Closing | DoorState::Between), Some(&head)) => head,
            _ => self.current_floor.get(),
        }
    }

    /// Sends a framed `FLOOR <n>` message to this car over its dispatcher connection.
    pub fn send_floor(&mut self, floor: Floor) -> std::io::Result<()> {
        let msg = elevator_proto::DispatcherToCar::new(floor).encode();
        elevator_proto::write_frame(&mut self.stream, &msg).map_err(to_io)
    }

    pub fn try_clone_stream(&self) -> std::io::Result<TcpStream> {
        self.stream.try_clone()
    }
}

fn to_io(e: elevator_proto::ProtoError) -> std::io::Error {
    std::io::Error::other(e)
}

/// Error returned when the car pool or a car's stop queue is full.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("car pool is full ({MAX_CARS} cars already registered)")]
    PoolFull,
    #[error("car {0:?} is not registered")]
    UnknownCar(String),
    #[error("stop queue for car {0:?} is full ({MAX_QUEUE_DEPTH} entries)")]
    QueueFull(String),
}

/// The dispatcher's live view of every connected car.
#[derive(Default)]
pub struct Registry {
    slots: Mutex<Vec<Option<CarEntry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new car, returning the slot index that identifies it for the
    /// lifetime of its connection.
    pub fn register(
        &self,
        name: String,
        lo: Floor,
        hi: Floor,
        stream: TcpStream,
    ) -> Result<usize, RegistryError> {
        let mut slots = self.slots.lock().unwrap();
        let entry = CarEntry {
            name,
            lo,
            hi,
            current_floor: lo,
            status: None,
            queue: Vec::new(),
            stream,
        };
        if let Some(empty) = slots.iter().position(Option::is_none) {
            slots[empty] = Some(entry);
            return Ok(empty);
        }
        if slots.len() >= MAX_CARS {
            return Err(RegistryError::PoolFull);
        }
        slots.push(Some(entry));
        Ok(slots.len() - 1)
    }

    /// Removes a car from the registry (connection ended, per spec §4.6).
    pub fn deregister(&self, index: usize) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(index) {
            *slot = None;
        }
    }

    /// Runs `f` with exclusive access to every in-use car, under the registry lock,
    /// for the scheduler (spec §4.6: "under the car-registry mutex, iterate every
    /// in-use car").
    pub fn with_cars<T>(&self, f: impl FnOnce(&mut [Option<CarEntry>]) -> T) -> T {
        let mut slots = self.slots.lock().unwrap();
        f(&mut slots)
    }

    /// Runs `f` with exclusive access to a single car, by slot index.
    pub fn with_car<T>(&self, index: usize, f: impl FnOnce(&mut CarEntry) -> T) -> Option<T> {
        let mut slots = self.slots.lock().unwrap();
        slots.get_mut(index).and_then(|s| s.as_mut()).map(f)
    }
}
