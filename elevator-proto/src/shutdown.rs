//! Shared `SIGINT`/`SIGPIPE` handling (spec §5 "cancellation and shutdown"): every
//! binary in the fleet installs the same handler pair so a `SIGINT` sets a volatile
//! shutdown flag instead of killing the process, and `SIGPIPE` never crashes a
//! writer whose peer has gone away.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SigHandler, Signal};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signum: i32) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs the fleet-wide signal policy: `SIGINT` latches a shutdown flag,
/// `SIGPIPE` is ignored so a write to a closed peer surfaces as an `Err` instead of
/// terminating the process. Call once, near the top of `main`.
pub fn install() {
    unsafe {
        // SAFETY: both handlers only touch a single `AtomicBool` (SIGINT) or do
        // nothing (SIGPIPE), which is async-signal-safe.
        let _ = signal::signal(Signal::SIGINT, SigHandler::Handler(on_sigint));
        let _ = signal::signal(Signal::SIGPIPE, SigHandler::SigIgn);
    }
}

/// `true` once a `SIGINT` has been observed. Polled from accept/operations loops;
/// never cleared within a process lifetime.
pub fn requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
