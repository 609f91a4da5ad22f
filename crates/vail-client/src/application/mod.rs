//! Application layer use cases for the client.
//!
//! # What use cases does the client have?
//!
//! - **`keyer`** – Reads paddle levels from a [`hardware::Hardware`]
//!   implementation and produces [`vail_core::KeyElement`]s, either as a
//!   straight key or as an iambic keyer (Mode A or Mode B).
//!
//! - **`outbox`** – The hand-off between keyer and send task: a FIFO queue
//!   plus the record of what was sent, for echo cancellation.
//!
//! - **`send`** – Drains the queue and writes one masked frame per event.
//!
//! - **`receive`** – Reads relay frames, cancels echoes, calibrates the clock
//!   offset and schedules tone playback behind a jitter buffer.
//!
//! - **`status`** – Mirrors the relay's peer count on an indicator.
//!
//! - **`session`** – State shared by these tasks for the lifetime of one
//!   relay connection.

pub mod hardware;
pub mod keyer;
pub mod outbox;
pub mod receive;
pub mod send;
pub mod session;
pub mod status;
