//! Per-connection workers (spec §4.6): one thread per accepted connection, deciding
//! from the first frame whether it is a car registration or a one-shot call, then
//! running that connection's loop to completion.

use std::net::TcpStream;

use elevator_proto::{message, CallReply, CallRequest, CarToDispatcher, DoorState, Floor};

use crate::registry::Registry;
use crate::scheduler::compute_insertion;

/// Reads the first frame of a freshly-accepted connection and routes it to the car
/// registration loop or the one-shot call handler (spec §4.6 "connection acceptance").
/// Anything else, or a frame that fails to parse, closes the connection.
pub fn handle(mut stream: TcpStream, registry: &Registry) {
    let first = match elevator_proto::read_frame(&mut stream) {
        Ok(payload) => payload,
        Err(_) => return,
    };

    match message::first_word(&first) {
        Ok("CAR") => handle_car(stream, &first, registry),
        Ok("CALL") => handle_call(&mut stream, &first, registry),
        _ => {}
    }
}

fn handle_car(stream: TcpStream, first: &[u8], registry: &Registry) {
    let (name, lo, hi) = match CarToDispatcher::decode(first) {
        Ok(CarToDispatcher::Register { name, lo, hi }) => (name, lo, hi),
        _ => return,
    };

    let mut read_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    };

    let index = match registry.register(name.clone(), lo, hi, stream) {
        Ok(idx) => idx,
        Err(e) => {
            tracing::warn!(car = %name, error = %e, "car registration rejected");
            return;
        }
    };
    tracing::info!(car = %name, lo = %lo, hi = %hi, "car registered");

    while let Ok(frame) = elevator_proto::read_frame(&mut read_stream) {
        match CarToDispatcher::decode(&frame) {
            Ok(CarToDispatcher::Status {
                state,
                current,
                destination: _,
            }) => on_status(registry, index, state, current),
            Ok(CarToDispatcher::IndividualService) | Ok(CarToDispatcher::Emergency) => break,
            _ => break,
        }
    }

    tracing::info!(car = %name, "car disconnected");
    registry.deregister(index);
}

/// Updates a car's reported state and, if it has just arrived at its next queued
/// stop with the door opening, pops that stop and advances it to the new head
/// (spec §4.6 "car registration" `STATUS` handling).
fn on_status(registry: &Registry, index: usize, state: DoorState, current: Floor) {
    registry.with_car(index, |car| {
        car.current_floor = current;
        car.status = Some(state);

        let Some(&head) = car.queue.first() else {
            return;
        };
        let arrived =
            current.get() == head && matches!(state, DoorState::Open | DoorState::Opening);
        if !arrived {
            return;
        }
        car.queue.remove(0);
        if let Some(&new_head) = car.queue.first() {
            if let Ok(f) = Floor::new(new_head) {
                let _ = car.send_floor(f);
            }
        }
    });
}

/// Parses and services one `CALL <src> <dst>` frame, replying over `stream` and
/// closing it (spec §4.6 "call handling").
fn handle_call(stream: &mut TcpStream, payload: &[u8], registry: &Registry) {
    let Ok(req) = CallRequest::decode(payload) else {
        return;
    };
    let reply = schedule(registry, req.src, req.dst);
    let _ = elevator_proto::write_frame(stream, &reply.encode());
}

/// The call scheduler (spec §4.6): picks the car with the lowest insertion cost
/// (ties broken by the resulting queue length), commits the new queue, and pokes the
/// car with a fresh `FLOOR` if its head changed.
pub fn schedule(registry: &Registry, src: Floor, dst: Floor) -> CallReply {
    registry.with_cars(|slots| {
        let mut best: Option<(usize, usize, usize)> = None; // (slot index, cost, final_len)

        for (idx, slot) in slots.iter().enumerate() {
            let Some(car) = slot else { continue };
            if !car.can_reach(src) || !car.can_reach(dst) {
                continue;
            }
            let Some(ins) =
                compute_insertion(car.routing_origin(), &car.queue, src.get(), dst.get())
            else {
                continue;
            };
            let cost = ins.cost();
            let final_len = ins.final_queue_len(car.queue.len());
            let better = match best {
                None => true,
                Some((_, best_cost, best_len)) => (cost, final_len) < (best_cost, best_len),
            };
            if better {
                best = Some((idx, cost, final_len));
            }
        }

        let Some((idx, _, _)) = best else {
            return CallReply::Unavailable;
        };

        let car = slots[idx].as_mut().expect("slot chosen above is in use");
        let Some(ins) = compute_insertion(car.routing_origin(), &car.queue, src.get(), dst.get())
        else {
            return CallReply::Unavailable;
        };

        let head_before = car.queue.first().copied();
        ins.apply(&mut car.queue, src.get(), dst.get());
        let head_after = car.queue.first().copied();

        if head_after != head_before {
            if let Some(new_head) = head_after {
                if let Ok(f) = Floor::new(new_head) {
                    let _ = car.send_floor(f);
                }
            }
        }

        CallReply::Car(car.name.clone())
    })
}
