//! Element timing derived from keying speed.
//!
//! Uses PARIS timing: one dit lasts `1200 / WPM` milliseconds, a dah lasts
//! three dits, and the space between elements of a character lasts one dit.

use crate::domain::element::Element;

/// Straight-key presses measured at or below this many milliseconds are
/// contact bounce and are never transmitted.
pub const DEBOUNCE_FLOOR_MS: u64 = 20;

/// Cadence at which the keyer samples paddle levels.
pub const POLL_INTERVAL_MS: u64 = 5;

/// Element durations for a fixed keying speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyerTiming {
    wpm: u16,
    dot_ms: u16,
}

impl KeyerTiming {
    /// Computes timing for `wpm` words per minute.
    ///
    /// The dot length is `1200 / wpm` rounded to the nearest millisecond.  A
    /// speed of zero is clamped to 1 WPM.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use vail_core::KeyerTiming;
    ///
    /// let t = KeyerTiming::from_wpm(25);
    /// assert_eq!(t.dot_ms(), 48);
    /// assert_eq!(t.dash_ms(), 144);
    /// ```
    pub fn from_wpm(wpm: u16) -> Self {
        let wpm = wpm.max(1);
        let w = u32::from(wpm);
        let dot_ms = ((1200 + w / 2) / w) as u16;
        Self { wpm, dot_ms }
    }

    /// Speed this timing was computed for.
    pub fn wpm(&self) -> u16 {
        self.wpm
    }

    /// Duration of a dit.
    pub fn dot_ms(&self) -> u16 {
        self.dot_ms
    }

    /// Duration of a dah (three dits).
    pub fn dash_ms(&self) -> u16 {
        self.dot_ms.saturating_mul(3)
    }

    /// Silence after each element (one dit).
    pub fn space_ms(&self) -> u16 {
        self.dot_ms
    }

    /// Tone duration for `element`.
    pub fn duration_of(&self, element: Element) -> u16 {
        match element {
            Element::Dit => self.dot_ms(),
            Element::Dah => self.dash_ms(),
        }
    }
}
