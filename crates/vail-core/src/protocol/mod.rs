//! Protocol module containing the event types, the event codec, and the
//! transport frame codec.

pub mod codec;
pub mod frame;
pub mod messages;

pub use codec::{decode_event, encode_event, ProtocolError};
pub use frame::{encode_client_frame, read_frame, Frame, FrameError, Opcode};
pub use messages::*;
