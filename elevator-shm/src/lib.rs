//! Process-shared car state region (spec §3/§4.3/§6): POSIX shared memory, a
//! `pthread_mutex_t`/`pthread_cond_t` pair initialized with `PTHREAD_PROCESS_SHARED`,
//! and the fixed-layout payload they guard.

pub mod error;
pub mod payload;
pub mod region;

pub use error::ShmError;
pub use payload::Payload;
pub use region::{CarRegion, RegionGuard};
