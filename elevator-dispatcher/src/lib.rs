//! Central dispatcher (spec §4.6): a single TCP listener accepting both long-lived
//! car connections and transient call-pad requests, a mutex-guarded car registry,
//! and the insertion-cost call scheduler.

pub mod connection;
pub mod registry;
pub mod scheduler;
pub mod server;

pub use registry::Registry;
pub use server::{run, Config};
