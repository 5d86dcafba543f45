use thiserror::Error;

/// Errors raised by the floor codec, the framed codec, and wire message parsing.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// A floor label did not match the grammar in spec §4.2 (e.g. `"0"`, `"B0"`, `"1000"`).
    #[error("invalid floor label: {0:?}")]
    InvalidFloor(String),

    /// An integer is outside the representable floor range `[-99,-1] ∪ [1,999]`.
    #[error("floor value out of range: {0}")]
    FloorOutOfRange(i32),

    /// A frame's payload exceeded `MAX_FRAME_LEN` bytes.
    #[error("frame payload of {0} bytes exceeds the 65535-byte limit")]
    FrameTooLarge(usize),

    /// The peer closed the stream (cleanly or on error); the connection is dead for good.
    #[error("stream closed")]
    StreamClosed,

    /// A wire message did not parse: wrong prefix, wrong number of fields, or a field
    /// that failed its own validation (e.g. a malformed floor or door state).
    #[error("malformed message: {0:?}")]
    MalformedMessage(String),

    /// Any other I/O failure (not EOF, not `Interrupted`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
