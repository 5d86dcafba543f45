//! Wire protocol shared by the dispatcher, the per-car controller, and the thin
//! call-pad / internal-controls CLIs: a length-prefixed framing layer, a floor label
//! codec, and the typed messages carried over it.

pub mod error;
pub mod floor;
pub mod frame;
pub mod limits;
pub mod message;
pub mod shutdown;

pub use error::ProtoError;
pub use floor::{Direction, Floor};
pub use frame::{read_frame, write_frame};
pub use message::{CallReply, CallRequest, CarToDispatcher, DispatcherToCar, DoorState};
