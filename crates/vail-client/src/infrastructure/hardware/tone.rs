//! Tone driver shared by the sidetone and the receive tone.
//!
//! One generator produces both tones at different pitches, like a single
//! PWM buzzer.  Whichever of `tx`/`rx` was switched on last owns the pitch;
//! switching either off silences the generator.

use std::cell::Cell;
use std::time::Duration;

use tracing::{debug, trace};

use crate::application::hardware::HardwareError;

/// Lowest pitch the driver accepts.
pub const MIN_TONE_HZ: u32 = 50;
/// Highest pitch the driver accepts.
pub const MAX_TONE_HZ: u32 = 10_000;

const CHIRP: [(u32, u64); 2] = [(1500, 100), (2000, 150)];

/// Current output of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneState {
    Off,
    On { hz: u32 },
}

#[derive(Debug)]
pub struct ToneDriver {
    tx_hz: u32,
    rx_hz: u32,
    state: Cell<ToneState>,
}

impl ToneDriver {
    /// Initialises the driver with the sidetone and receive pitches.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::UnsupportedFrequency`] if either pitch is
    /// outside `MIN_TONE_HZ..=MAX_TONE_HZ`.
    pub fn new(tx_hz: u32, rx_hz: u32) -> Result<Self, HardwareError> {
        for hz in [tx_hz, rx_hz] {
            if !(MIN_TONE_HZ..=MAX_TONE_HZ).contains(&hz) {
                return Err(HardwareError::UnsupportedFrequency {
                    hz,
                    min: MIN_TONE_HZ,
                    max: MAX_TONE_HZ,
                });
            }
        }
        debug!(tx_hz, rx_hz, "tone driver ready");
        Ok(Self {
            tx_hz,
            rx_hz,
            state: Cell::new(ToneState::Off),
        })
    }

    pub fn state(&self) -> ToneState {
        self.state.get()
    }

    pub fn tx(&self, on: bool) {
        self.switch(on, self.tx_hz);
    }

    pub fn rx(&self, on: bool) {
        self.switch(on, self.rx_hz);
    }

    /// Two rising beeps signalling that the relay session is up.
    pub async fn startup_chirp(&self) {
        for (hz, ms) in CHIRP {
            self.set(ToneState::On { hz });
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        self.set(ToneState::Off);
    }

    fn switch(&self, on: bool, hz: u32) {
        let next = if on { ToneState::On { hz } } else { ToneState::Off };
        self.set(next);
    }

    fn set(&self, next: ToneState) {
        if self.state.replace(next) != next {
            trace!(?next, "tone");
        }
    }
}
