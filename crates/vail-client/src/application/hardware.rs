//! The hardware boundary used by every task.
//!
//! The application layer never touches pins or tone generators directly.  It
//! talks to a [`Hardware`] implementation injected at construction time:
//!
//! - `infrastructure::hardware::VirtualPins` – host implementation with a
//!   software tone driver and an interrupt-style pin bank.
//! - `infrastructure::hardware::mock::ScriptedHardware` – replays scripted
//!   paddle presses against the tokio clock and records tone changes, for
//!   tests.

use thiserror::Error;
use vail_core::{PaddleEvent, PaddleState};

/// Error type for hardware initialisation.
///
/// Hardware is only allowed to fail while it is being set up; once the tasks
/// are running every method is infallible.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("tone driver rejected {hz} Hz (supported {min}..={max} Hz)")]
    UnsupportedFrequency { hz: u32, min: u32, max: u32 },
}

/// Paddle inputs, tone outputs and the status indicator.
///
/// All methods take `&self`: implementations use interior mutability so one
/// instance can be shared by the keyer, receive and status tasks through an
/// `Rc`.
#[cfg_attr(test, mockall::automock)]
pub trait Hardware {
    /// Current paddle levels, already corrected for contact polarity.
    fn read_paddles(&self) -> PaddleState;

    /// Starts capturing transitions into the interrupt ring buffer.
    fn enable_interrupts(&self);

    /// Oldest unread transition captured by the interrupt handler.
    fn poll_ring_buffer(&self) -> Option<PaddleEvent>;

    /// Local sidetone on/off (transmit pitch).
    fn tx_tone(&self, on: bool);

    /// Playback tone on/off (receive pitch).
    fn rx_tone(&self, on: bool);

    /// Status indicator on/off.
    fn set_indicator(&self, on: bool);
}
