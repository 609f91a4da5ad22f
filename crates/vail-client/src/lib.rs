//! vail-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does vail-client do? (for beginners)
//!
//! The client turns a Morse key or a pair of iambic paddles into timestamped
//! keying events for a Vail relay, and plays back the keying of the other
//! stations in the same channel.
//!
//! 1. At boot it samples the paddles once.  A paddle held down selects
//!    straight-key mode on that contact; otherwise the iambic keyer runs.
//! 2. The keyer turns paddle levels into dits, dahs or manual presses, sounds
//!    the local sidetone, and queues one event per element.
//! 3. The send task masks each event into a binary frame and writes it to the
//!    relay.
//! 4. The receive pipeline reads relay frames, drops our own echoes, aligns
//!    remote timestamps with the local clock, waits out a jitter buffer, and
//!    plays each duration sequence on the receive tone.
//! 5. A status task blinks an indicator while other stations are present.
//!
//! All four tasks run cooperatively on a single thread.  The only preemptive
//! producer is the pin interrupt, which talks to the keyer through a
//! lock-free ring buffer.

/// Application layer: keyer, send, receive and status tasks.
pub mod application;

/// Infrastructure layer: hardware adapters, relay handshake and configuration.
pub mod infrastructure;
