//! The car payload: the fields in spec §3, laid out as fixed-size byte buffers so that
//! a consistency violation (e.g. a boolean holding something other than 0/1, or a
//! floor buffer holding garbage) is representable and therefore detectable, exactly
//! the scenario the safety monitor's consistency sweep exists to catch.

use std::fmt;

use elevator_proto::floor::{self};
use elevator_proto::{DoorState, Floor};

use crate::error::ShmError;

pub(crate) const FLOOR_BUF_LEN: usize = 4; // "B99\0" / "999\0"
pub(crate) const STATUS_BUF_LEN: usize = 8; // "Closing\0"

/// Fixed-layout payload following the mutex and condvar in the region (spec §6).
/// Every field is either a small fixed byte buffer or a `u8` flag; both make
/// inconsistent raw writes representable instead of impossible, which is what lets
/// the safety monitor's consistency sweep mean anything.
#[repr(C)]
pub struct Payload {
    pub current_floor: [u8; FLOOR_BUF_LEN],
    pub destination_floor: [u8; FLOOR_BUF_LEN],
    pub status: [u8; STATUS_BUF_LEN],
    pub open_button: u8,
    pub close_button: u8,
    pub door_obstruction: u8,
    pub overload: u8,
    pub emergency_stop: u8,
    pub individual_service_mode: u8,
    pub emergency_mode: u8,
    pub safety_system: u8,
}

impl Payload {
    pub(crate) fn init_defaults(&mut self) {
        write_text(&mut self.current_floor, "1");
        write_text(&mut self.destination_floor, "1");
        write_text(&mut self.status, DoorState::Closed.as_str());
        self.open_button = 0;
        self.close_button = 0;
        self.door_obstruction = 0;
        self.overload = 0;
        self.emergency_stop = 0;
        self.individual_service_mode = 0;
        self.emergency_mode = 0;
        self.safety_system = 0;
    }

    pub fn current_floor(&self) -> Result<Floor, ShmError> {
        read_floor(&self.current_floor)
    }

    pub fn set_current_floor(&mut self, floor: Floor) {
        let mut buf = String::new();
        floor::from_int(floor.get(), &mut buf).expect("Floor is always in range");
        write_text(&mut self.current_floor, &buf);
    }

    pub fn destination_floor(&self) -> Result<Floor, ShmError> {
        read_floor(&self.destination_floor)
    }

    pub fn set_destination_floor(&mut self, floor: Floor) {
        let mut buf = String::new();
        floor::from_int(floor.get(), &mut buf).expect("Floor is always in range");
        write_text(&mut self.destination_floor, &buf);
    }

    pub fn status(&self) -> Result<DoorState, ShmError> {
        read_text(&self.status)
            .parse()
            .map_err(|_| ShmError::Inconsistent(format!("status {:?}", read_text(&self.status))))
    }

    pub fn set_status(&mut self, status: DoorState) {
        write_text(&mut self.status, status.as_str());
    }

    pub fn open_button(&self) -> bool {
        self.open_button != 0
    }
    pub fn set_open_button(&mut self, v: bool) {
        self.open_button = v as u8;
    }
    pub fn close_button(&self) -> bool {
        self.close_button != 0
    }
    pub fn set_close_button(&mut self, v: bool) {
        self.close_button = v as u8;
    }
    pub fn door_obstruction(&self) -> bool {
        self.door_obstruction != 0
    }
    pub fn set_door_obstruction(&mut self, v: bool) {
        self.door_obstruction = v as u8;
    }
    pub fn overload(&self) -> bool {
        self.overload != 0
    }
    pub fn set_overload(&mut self, v: bool) {
        self.overload = v as u8;
    }
    pub fn emergency_stop(&self) -> bool {
        self.emergency_stop != 0
    }
    pub fn set_emergency_stop(&mut self, v: bool) {
        self.emergency_stop = v as u8;
    }
    pub fn individual_service_mode(&self) -> bool {
        self.individual_service_mode != 0
    }
    pub fn set_individual_service_mode(&mut self, v: bool) {
        self.individual_service_mode = v as u8;
    }
    pub fn emergency_mode(&self) -> bool {
        self.emergency_mode != 0
    }
    /// Latches; callers never clear this once set (spec §3).
    pub fn set_emergency_mode(&mut self, v: bool) {
        self.emergency_mode = v as u8;
    }

    /// Every boolean field as `(name, raw value)`, for the safety monitor's
    /// `< 2` consistency check (spec §4.4 step 5) — any value above 1 is a violation.
    pub fn boolean_fields(&self) -> [(&'static str, u8); 7] {
        [
            ("open_button", self.open_button),
            ("close_button", self.close_button),
            ("door_obstruction", self.door_obstruction),
            ("overload", self.overload),
            ("emergency_stop", self.emergency_stop),
            ("individual_service_mode", self.individual_service_mode),
            ("emergency_mode", self.emergency_mode),
        ]
    }

    /// Runs the full consistency sweep from spec §4.4 step 5 and returns the first
    /// violation found, if any.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.current_floor().is_err() {
            return Err(format!("current_floor {:?}", read_text(&self.current_floor)));
        }
        if self.destination_floor().is_err() {
            return Err(format!(
                "destination_floor {:?}",
                read_text(&self.destination_floor)
            ));
        }
        let status = self
            .status()
            .map_err(|_| format!("status {:?}", read_text(&self.status)))?;
        for (name, v) in self.boolean_fields() {
            if v >= 2 {
                return Err(format!("{name} holds non-boolean value {v}"));
            }
        }
        if self.door_obstruction() && !matches!(status, DoorState::Opening | DoorState::Closing) {
            return Err(format!(
                "door_obstruction set while status is {status} (expected Opening or Closing)"
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("current_floor", &read_text(&self.current_floor))
            .field("destination_floor", &read_text(&self.destination_floor))
            .field("status", &read_text(&self.status))
            .field("open_button", &self.open_button)
            .field("close_button", &self.close_button)
            .field("door_obstruction", &self.door_obstruction)
            .field("overload", &self.overload)
            .field("emergency_stop", &self.emergency_stop)
            .field("individual_service_mode", &self.individual_service_mode)
            .field("emergency_mode", &self.emergency_mode)
            .field("safety_system", &self.safety_system)
            .finish()
    }
}

fn write_text(buf: &mut [u8], s: &str) {
    buf.fill(0);
    let bytes = s.as_bytes();
    debug_assert!(bytes.len() < buf.len(), "text {s:?} does not fit");
    buf[..bytes.len()].copy_from_slice(bytes);
}

fn read_text(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or("")
}

fn read_floor(buf: &[u8]) -> Result<Floor, ShmError> {
    let s = read_text(buf);
    Ok(s.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> Payload {
        let mut p = Payload {
            current_floor: [0; FLOOR_BUF_LEN],
            destination_floor: [0; FLOOR_BUF_LEN],
            status: [0; STATUS_BUF_LEN],
            open_button: 0,
            close_button: 0,
            door_obstruction: 0,
            overload: 0,
            emergency_stop: 0,
            individual_service_mode: 0,
            emergency_mode: 0,
            safety_system: 0,
        };
        p.init_defaults();
        p
    }

    #[test]
    fn defaults_are_consistent() {
        let p = blank();
        assert_eq!(p.current_floor().unwrap().get(), 1);
        assert_eq!(p.status().unwrap(), DoorState::Closed);
        assert!(p.check_consistency().is_ok());
    }

    #[test]
    fn detects_bad_status_text() {
        let mut p = blank();
        write_text(&mut p.status, "Huh");
        assert!(p.status().is_err());
        assert!(p.check_consistency().is_err());
    }

    #[test]
    fn detects_non_boolean_flag() {
        let mut p = blank();
        p.overload = 7;
        assert!(p.check_consistency().is_err());
    }

    #[test]
    fn detects_obstruction_invariant_violation() {
        let mut p = blank();
        p.set_status(DoorState::Open);
        p.set_door_obstruction(true);
        assert!(p.check_consistency().is_err());

        p.set_status(DoorState::Closing);
        assert!(p.check_consistency().is_ok());
    }
}
