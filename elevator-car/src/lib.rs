//! Per-car controller (spec §4.5): two worker threads sharing the car's shared
//! memory region and a private mutex around the dispatcher's `TcpStream`.

pub mod connection;
pub mod dispatcher_task;
pub mod fsm;
pub mod operations_task;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use elevator_proto::Floor;
use elevator_shm::CarRegion;

use connection::Connection;
use fsm::Fsm;

pub struct Config {
    pub name: String,
    pub lo: Floor,
    pub hi: Floor,
    pub tick: Duration,
    pub dispatcher_addr: String,
}

/// Creates (or attaches to) the car's shared region, then spawns and joins the
/// dispatcher and operations tasks (spec §4.5/§5's "two worker threads" model).
pub fn run(config: Config) -> anyhow::Result<()> {
    let region = Arc::new(CarRegion::create_or_open(&config.name).map_err(|e| {
        anyhow::anyhow!(
            "failed to create or open shared region for car {:?}: {e}",
            config.name
        )
    })?);
    {
        let mut guard = region.lock()?;
        guard.payload_mut().set_current_floor(config.lo);
        guard.payload_mut().set_destination_floor(config.lo);
        guard.broadcast()?;
    }

    let conn = Arc::new(Connection::new());
    let dest_changed = Arc::new(AtomicBool::new(false));
    let fsm = Fsm::new(config.tick, config.lo, config.hi);

    let dispatcher_handle = {
        let region = Arc::clone(&region);
        let conn = Arc::clone(&conn);
        let dest_changed = Arc::clone(&dest_changed);
        let name = config.name.clone();
        let lo = config.lo;
        let hi = config.hi;
        let addr = config.dispatcher_addr.clone();
        let tick = config.tick;
        std::thread::spawn(move || {
            dispatcher_task::run(region, conn, dest_changed, name, lo, hi, addr, tick)
        })
    };

    let operations_handle = {
        let region = Arc::clone(&region);
        let conn = Arc::clone(&conn);
        let dest_changed = Arc::clone(&dest_changed);
        let tick = config.tick;
        std::thread::spawn(move || operations_task::run(region, conn, dest_changed, tick, fsm))
    };

    dispatcher_handle.join().expect("dispatcher task panicked");
    operations_handle.join().expect("operations task panicked");
    Ok(())
}
