//! Compile-time capacities shared by the dispatcher and the per-car controller (spec §5).

/// Maximum number of cars a single dispatcher can hold registered at once.
pub const MAX_CARS: usize = 10;

/// Maximum number of simultaneous connections (registered cars + in-flight call pads).
pub const MAX_CONNECTIONS: usize = 30;

/// Maximum number of floors a car's stop queue may hold at once.
pub const MAX_QUEUE_DEPTH: usize = 20;

/// Maximum length, in bytes, of a car's name.
pub const MAX_CAR_NAME_LEN: usize = 128;

/// Size of the scratch buffer used to read one frame's payload.
pub const PAYLOAD_BUFFER_LEN: usize = 256;

/// Largest payload a frame can carry (16-bit length prefix).
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;
