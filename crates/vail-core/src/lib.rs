//! # vail-core
//!
//! Shared library for the Vail Morse-keying client containing the wire event
//! codec, the transport frame codec, and the keying domain types.
//!
//! It has zero dependencies on hardware, sockets, or configuration files.  The
//! only I/O abstraction it touches is `tokio::io::AsyncRead`, so that frames
//! can be read from any byte stream (a TCP socket in production, a scripted
//! buffer in tests).
//!
//! # Architecture overview (for beginners)
//!
//! A Vail relay is a chat room for Morse code.  Every station connected to the
//! same channel receives every other station's keying as a list of tone
//! durations, stamped with the wall-clock millisecond at which keying started.
//! The relay also echoes a station's own transmissions back to it.
//!
//! This crate (`vail-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  A keying event is an
//!   8-byte timestamp, a 2-byte field (reserved on send, peer count on
//!   receive), and a list of 2-byte durations.  Events travel inside
//!   WebSocket-style binary frames.
//!
//! - **`domain`** – Pure keying logic with no I/O: element timing derived from
//!   words-per-minute, the bounded history used for echo cancellation, the
//!   lock-free paddle ring buffer fed by the pin interrupt, and the clock
//!   offset used to align remote timestamps with the local clock.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `vail_core::KeyElement` instead of `vail_core::domain::element::KeyElement`.
pub use domain::clock::{playback_wait_ms, ClockOffset, EpochAnchor, TimestampOutOfRange};
pub use domain::element::{
    Contact, Element, ElementKind, KeyElement, PaddleEvent, PaddleState, Polarity,
};
pub use domain::history::{SentEntry, SentHistory};
pub use domain::ring::PaddleRing;
pub use domain::timing::KeyerTiming;
pub use protocol::codec::{decode_event, encode_event, ProtocolError};
pub use protocol::frame::{encode_client_frame, read_frame, Frame, FrameError, Opcode};
pub use protocol::messages::{InboundEvent, InboundKind, OutboundEvent};
