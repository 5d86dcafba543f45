//! Integration tests driving a real in-process dispatcher over loopback TCP
//! (spec §8 scenarios 1 and 2).

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use elevator_dispatcher::server::{self, Config};
use elevator_proto::{CallReply, CallRequest, CarToDispatcher, DispatcherToCar, DoorState, Floor};

fn start_dispatcher() -> SocketAddr {
    let listener = server::bind(&Config {
        bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    })
    .expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    thread::spawn(move || {
        let _ = server::serve(listener);
    });
    addr
}

fn floor(n: i32) -> Floor {
    Floor::new(n).unwrap()
}

/// Connects as a car, registers, and reports a single `STATUS`. Keeps the
/// connection (and its read half) alive for the caller to poll `FLOOR` on.
fn register_car(addr: SocketAddr, name: &str, lo: i32, hi: i32) -> TcpStream {
    let mut stream = TcpStream::connect(addr).expect("connect");
    let register = CarToDispatcher::Register {
        name: name.to_owned(),
        lo: floor(lo),
        hi: floor(hi),
    };
    elevator_proto::write_frame(&mut stream, &register.encode()).unwrap();
    let status = CarToDispatcher::Status {
        state: DoorState::Closed,
        current: floor(lo),
        destination: floor(lo),
    };
    elevator_proto::write_frame(&mut stream, &status.encode()).unwrap();
    stream
}

fn call(addr: SocketAddr, src: i32, dst: i32) -> CallReply {
    let mut stream = TcpStream::connect(addr).expect("connect");
    let request = CallRequest {
        src: floor(src),
        dst: floor(dst),
    };
    elevator_proto::write_frame(&mut stream, &request.encode()).unwrap();
    let reply = elevator_proto::read_frame(&mut stream).unwrap();
    CallReply::decode(&reply).unwrap()
}

fn expect_floor(stream: &mut TcpStream, expected: i32) {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let frame = elevator_proto::read_frame(stream).unwrap();
    let msg = DispatcherToCar::decode(&frame).unwrap();
    assert_eq!(msg.floor.get(), expected);
}

#[test]
fn three_car_dispatch() {
    let addr = start_dispatcher();
    // Give the accept loop's nonblocking poll a moment to start running.
    thread::sleep(Duration::from_millis(50));

    let mut alpha = register_car(addr, "Alpha", 1, 4);
    let mut beta = register_car(addr, "Beta", -3, 1);
    let mut gamma = register_car(addr, "Gamma", 2, 5);
    thread::sleep(Duration::from_millis(50));

    assert_eq!(call(addr, 1, 3), CallReply::Car("Alpha".to_owned()));
    expect_floor(&mut alpha, 1);

    assert_eq!(call(addr, 1, -2), CallReply::Car("Beta".to_owned()));
    expect_floor(&mut beta, 1);

    assert_eq!(call(addr, 3, 5), CallReply::Car("Gamma".to_owned()));
    expect_floor(&mut gamma, 3);

    assert_eq!(call(addr, 1, 5), CallReply::Unavailable);
    assert_eq!(call(addr, -3, 3), CallReply::Unavailable);
}

#[test]
fn queue_insertion_preserves_direction() {
    let addr = start_dispatcher();
    thread::sleep(Duration::from_millis(50));

    let mut car = register_car(addr, "Solo", 1, 10);
    // Establish a queue of [3, 7] while the car is at floor 1 heading up: a
    // call from 3 to 7 seeds the queue with both stops in order.
    assert_eq!(call(addr, 3, 7), CallReply::Car("Solo".to_owned()));
    expect_floor(&mut car, 3);

    assert_eq!(call(addr, 5, 6), CallReply::Car("Solo".to_owned()));
    // The new stop is inserted between 3 and 7, not appended; the head (3)
    // does not change, so no new FLOOR message is sent for this call.

    assert_eq!(call(addr, 8, 2), CallReply::Car("Solo".to_owned()));
}
