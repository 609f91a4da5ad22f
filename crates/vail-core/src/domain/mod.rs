//! Keying domain types.
//!
//! This module contains pure keying logic with no hardware, socket, or file
//! dependencies.  Everything here can be compiled and tested on any host.
//!
//! # What lives here? (for beginners)
//!
//! - **`timing`** – How long a dit, a dah and an inter-element space last at a
//!   given speed in words per minute, plus the straight-key debounce floor.
//! - **`element`** – The vocabulary of keying: paddle contacts, the levels read
//!   from them, transitions captured by the pin interrupt, and the completed
//!   [`element::KeyElement`] records the keyer produces.
//! - **`history`** – The short list of recently transmitted elements used to
//!   recognise our own keying when the relay echoes it back.
//! - **`ring`** – The lock-free ring buffer between the pin interrupt and the
//!   keyer task.
//! - **`clock`** – Conversion between the local monotonic clock and wall-clock
//!   epoch milliseconds.

pub mod clock;
pub mod element;
pub mod history;
pub mod ring;
pub mod timing;
