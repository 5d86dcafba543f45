//! The six wire message shapes carried over framed connections (spec §6).

use std::fmt;
use std::str::FromStr;

use crate::error::ProtoError;
use crate::floor::Floor;

/// Door state, as carried on the wire and held in the shared car region (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Opening,
    Open,
    Closing,
    Closed,
    /// The car is moving between floors; no door phase applies.
    Between,
}

impl DoorState {
    pub const ALL: [DoorState; 5] = [
        DoorState::Opening,
        DoorState::Open,
        DoorState::Closing,
        DoorState::Closed,
        DoorState::Between,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DoorState::Opening => "Opening",
            DoorState::Open => "Open",
            DoorState::Closing => "Closing",
            DoorState::Closed => "Closed",
            DoorState::Between => "Between",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoorState {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Opening" => Ok(DoorState::Opening),
            "Open" => Ok(DoorState::Open),
            "Closing" => Ok(DoorState::Closing),
            "Closed" => Ok(DoorState::Closed),
            "Between" => Ok(DoorState::Between),
            other => Err(ProtoError::MalformedMessage(other.to_owned())),
        }
    }
}

fn payload_str(payload: &[u8]) -> Result<&str, ProtoError> {
    std::str::from_utf8(payload)
        .map_err(|_| ProtoError::MalformedMessage("non-UTF-8 payload".to_owned()))
}

fn malformed(s: &str) -> ProtoError {
    ProtoError::MalformedMessage(s.to_owned())
}

/// Messages a car sends to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarToDispatcher {
    /// `CAR <name> <lo> <hi>` — sent once, as the first frame.
    Register { name: String, lo: Floor, hi: Floor },
    /// `STATUS <state> <current> <destination>` — sent repeatedly.
    Status {
        state: DoorState,
        current: Floor,
        destination: Floor,
    },
    /// `INDIVIDUAL SERVICE` — sent once, immediately before close.
    IndividualService,
    /// `EMERGENCY` — sent once, immediately before close.
    Emergency,
}

impl CarToDispatcher {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            CarToDispatcher::Register { name, lo, hi } => {
                format!("CAR {name} {lo} {hi}").into_bytes()
            }
            CarToDispatcher::Status {
                state,
                current,
                destination,
            } => format!("STATUS {state} {current} {destination}").into_bytes(),
            CarToDispatcher::IndividualService => b"INDIVIDUAL SERVICE".to_vec(),
            CarToDispatcher::Emergency => b"EMERGENCY".to_vec(),
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtoError> {
        let s = payload_str(payload)?;
        if s == "INDIVIDUAL SERVICE" {
            return Ok(CarToDispatcher::IndividualService);
        }
        if s == "EMERGENCY" {
            return Ok(CarToDispatcher::Emergency);
        }
        let mut parts = s.split_ascii_whitespace();
        match parts.next() {
            Some("CAR") => {
                let name = parts.next().ok_or_else(|| malformed(s))?.to_owned();
                let lo: Floor = parts
                    .next()
                    .ok_or_else(|| malformed(s))?
                    .parse()
                    .map_err(|_| malformed(s))?;
                let hi: Floor = parts
                    .next()
                    .ok_or_else(|| malformed(s))?
                    .parse()
                    .map_err(|_| malformed(s))?;
                if parts.next().is_some() {
                    return Err(malformed(s));
                }
                Ok(CarToDispatcher::Register { name, lo, hi })
            }
            Some("STATUS") => {
                let state: DoorState = parts.next().ok_or_else(|| malformed(s))?.parse()?;
                let current: Floor = parts
                    .next()
                    .ok_or_else(|| malformed(s))?
                    .parse()
                    .map_err(|_| malformed(s))?;
                let destination: Floor = parts
                    .next()
                    .ok_or_else(|| malformed(s))?
                    .parse()
                    .map_err(|_| malformed(s))?;
                if parts.next().is_some() {
                    return Err(malformed(s));
                }
                Ok(CarToDispatcher::Status {
                    state,
                    current,
                    destination,
                })
            }
            _ => Err(malformed(s)),
        }
    }
}

/// `FLOOR <floor>` — the only message the dispatcher sends to a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherToCar {
    pub floor: Floor,
}

impl DispatcherToCar {
    pub fn new(floor: Floor) -> Self {
        DispatcherToCar { floor }
    }

    pub fn encode(&self) -> Vec<u8> {
        format!("FLOOR {}", self.floor).into_bytes()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtoError> {
        let s = payload_str(payload)?;
        let mut parts = s.split_ascii_whitespace();
        if parts.next() != Some("FLOOR") {
            return Err(malformed(s));
        }
        let floor: Floor = parts
            .next()
            .ok_or_else(|| malformed(s))?
            .parse()
            .map_err(|_| malformed(s))?;
        if parts.next().is_some() {
            return Err(malformed(s));
        }
        Ok(DispatcherToCar { floor })
    }
}

/// `CALL <src> <dst>` — the one frame a call pad sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRequest {
    pub src: Floor,
    pub dst: Floor,
}

impl CallRequest {
    pub fn encode(&self) -> Vec<u8> {
        format!("CALL {} {}", self.src, self.dst).into_bytes()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtoError> {
        let s = payload_str(payload)?;
        let mut parts = s.split_ascii_whitespace();
        if parts.next() != Some("CALL") {
            return Err(malformed(s));
        }
        let src: Floor = parts
            .next()
            .ok_or_else(|| malformed(s))?
            .parse()
            .map_err(|_| malformed(s))?;
        let dst: Floor = parts
            .next()
            .ok_or_else(|| malformed(s))?
            .parse()
            .map_err(|_| malformed(s))?;
        if parts.next().is_some() {
            return Err(malformed(s));
        }
        Ok(CallRequest { src, dst })
    }
}

/// The dispatcher's one-shot reply to a call pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallReply {
    Car(String),
    Unavailable,
}

impl CallReply {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            CallReply::Car(name) => format!("CAR {name}").into_bytes(),
            CallReply::Unavailable => b"UNAVAILABLE".to_vec(),
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtoError> {
        let s = payload_str(payload)?;
        if s == "UNAVAILABLE" {
            return Ok(CallReply::Unavailable);
        }
        let mut parts = s.split_ascii_whitespace();
        if parts.next() != Some("CAR") {
            return Err(malformed(s));
        }
        let name = parts.next().ok_or_else(|| malformed(s))?.to_owned();
        if parts.next().is_some() {
            return Err(malformed(s));
        }
        Ok(CallReply::Car(name))
    }
}

/// The first whitespace-delimited token of a frame, used by the dispatcher's accept
/// loop to decide whether a freshly-accepted connection is a car or a call pad.
pub fn first_word(payload: &[u8]) -> Result<&str, ProtoError> {
    let s = payload_str(payload)?;
    s.split_ascii_whitespace()
        .next()
        .ok_or_else(|| malformed(s))
}
