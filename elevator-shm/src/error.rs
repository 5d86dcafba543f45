use thiserror::Error;

/// Errors raised while creating, opening, or validating a car's shared state region.
#[derive(Debug, Error)]
pub enum ShmError {
    /// `shm_open`/`ftruncate`/`mmap` failed.
    #[error("shared memory operation failed: {0}")]
    Os(#[from] nix::Error),

    /// A pthread mutex/condvar primitive call returned a non-zero error code.
    #[error("pthread primitive failed with errno {0}")]
    Pthread(i32),

    /// The car name does not fit the region's naming scheme (empty or too long).
    #[error("invalid car name: {0:?}")]
    InvalidCarName(String),

    /// A value read from the region violates one of the invariants in spec §3.
    #[error("shared state consistency violation: {0}")]
    Inconsistent(String),

    /// Wraps a floor/message parse failure surfaced while reading the region.
    #[error(transparent)]
    Proto(#[from] elevator_proto::ProtoError),
}
