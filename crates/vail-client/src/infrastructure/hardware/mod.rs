//! Hardware adapters implementing [`crate::application::hardware::Hardware`].
//!
//! - **`tone`** – `ToneDriver`, the single tone generator shared by the
//!   sidetone and the receive tone.  Its construction is the only hardware
//!   step that may fail.
//! - **`virtual_pins`** – `VirtualPins`, a host implementation whose pin
//!   levels are set by an external driver thread.  `PinHandle::set_level`
//!   plays the role of the pin interrupt.
//! - **`mock`** – `ScriptedHardware`, replaying scripted paddle presses for
//!   tests.

pub mod mock;
pub mod tone;
pub mod virtual_pins;

pub use tone::ToneDriver;
pub use virtual_pins::{spawn_line_driver, PinHandle, VirtualPins};
