//! Scripted hardware for tests.
//!
//! # Why a scripted mock?
//!
//! Keyer behaviour depends on *when* a paddle is pressed relative to the
//! keyer's 5 ms polling and its element timers.  `ScriptedHardware` answers
//! `read_paddles` from a list of press intervals evaluated against a
//! [`LocalClock`], so a test running under `#[tokio::test(start_paused = true)]`
//! gets fully deterministic timing.  Every output change is recorded with the
//! clock reading at which it happened.
//!
//! # Usage in tests
//!
//! ```ignore
//! let clock = LocalClock::start();
//! let hw = Rc::new(ScriptedHardware::new(clock).press(Contact::Dit, 100, 121));
//! // ... run the keyer for a while ...
//! assert_eq!(hw.tx_tone_changes(), vec![(100, true), (125, false)]);
//! ```

use std::cell::{Cell, RefCell};

use vail_core::{Contact, PaddleEvent, PaddleState};

use crate::application::hardware::Hardware;
use crate::application::session::LocalClock;

/// An output change observed by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    TxTone(bool),
    RxTone(bool),
    Indicator(bool),
}

/// `contact` is held during `from_ms..until_ms` on the local clock.
#[derive(Debug, Clone, Copy)]
struct Press {
    contact: Contact,
    from_ms: u64,
    until_ms: u64,
}

/// Hardware replaying scripted presses and recording outputs.
pub struct ScriptedHardware {
    clock: LocalClock,
    presses: Vec<Press>,
    /// Edges in time order, handed out by `poll_ring_buffer`.
    edges: Vec<(u64, PaddleEvent)>,
    next_edge: Cell<usize>,
    irq_enabled: Cell<bool>,
    outputs: RefCell<Vec<(u64, Output)>>,
}

impl ScriptedHardware {
    pub fn new(clock: LocalClock) -> Self {
        Self {
            clock,
            presses: Vec::new(),
            edges: Vec::new(),
            next_edge: Cell::new(0),
            irq_enabled: Cell::new(false),
            outputs: RefCell::new(Vec::new()),
        }
    }

    /// Adds a press of `contact` from `from_ms` (inclusive) to `until_ms`
    /// (exclusive).
    pub fn press(mut self, contact: Contact, from_ms: u64, until_ms: u64) -> Self {
        self.presses.push(Press {
            contact,
            from_ms,
            until_ms,
        });
        for (at, pressed) in [(from_ms, true), (until_ms, false)] {
            self.edges.push((
                at,
                PaddleEvent {
                    timestamp_ms: at as u32,
                    pressed,
                    source: contact,
                },
            ));
        }
        self.edges.sort_by_key(|(at, _)| *at);
        self
    }

    /// `(time, on)` pairs for the sidetone only.
    pub fn tx_tone_changes(&self) -> Vec<(u64, bool)> {
        self.filter(|out| match out {
            Output::TxTone(on) => Some(on),
            _ => None,
        })
    }

    /// `(time, on)` pairs for the receive tone only.
    pub fn rx_tone_changes(&self) -> Vec<(u64, bool)> {
        self.filter(|out| match out {
            Output::RxTone(on) => Some(on),
            _ => None,
        })
    }

    fn filter(&self, pick: impl Fn(Output) -> Option<bool>) -> Vec<(u64, bool)> {
        self.outputs
            .borrow()
            .iter()
            .filter_map(|&(at, out)| pick(out).map(|on| (at, on)))
            .collect()
    }

    fn held(&self, contact: Contact, now: u64) -> bool {
        self.presses
            .iter()
            .any(|p| p.contact == contact && (p.from_ms..p.until_ms).contains(&now))
    }

    fn record(&self, output: Output) {
        self.outputs
            .borrow_mut()
            .push((self.clock.now_ms(), output));
    }
}

impl Hardware for ScriptedHardware {
    fn read_paddles(&self) -> PaddleState {
        let now = self.clock.now_ms();
        PaddleState::new(self.held(Contact::Dit, now), self.held(Contact::Dah, now))
    }

    fn enable_interrupts(&self) {
        self.irq_enabled.set(true);
    }

    fn poll_ring_buffer(&self) -> Option<PaddleEvent> {
        if !self.irq_enabled.get() {
            return None;
        }
        let index = self.next_edge.get();
        let (at, event) = *self.edges.get(index)?;
        if at > self.clock.now_ms() {
            return None;
        }
        self.next_edge.set(index + 1);
        Some(event)
    }

    fn tx_tone(&self, on: bool) {
        self.record(Output::TxTone(on));
    }

    fn rx_tone(&self, on: bool) {
        self.record(Output::RxTone(on));
    }

    fn set_indicator(&self, on: bool) {
        self.record(Output::Indicator(on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_presses_follow_the_clock() {
        // Arrange
        let clock = LocalClock::start();
        let hw = ScriptedHardware::new(clock).press(Contact::Dah, 10, 20);

        // Act / Assert
        assert!(!hw.read_paddles().dah);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(hw.read_paddles().dah);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!hw.read_paddles().dah);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edges_only_after_interrupts_enabled_and_due() {
        let clock = LocalClock::start();
        let hw = ScriptedHardware::new(clock).press(Contact::Dit, 0, 30);

        assert!(hw.poll_ring_buffer().is_none());
        hw.enable_interrupts();
        assert!(hw.poll_ring_buffer().is_some_and(|e| e.pressed));
        assert!(hw.poll_ring_buffer().is_none());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(hw.poll_ring_buffer().is_some_and(|e| !e.pressed));
    }
}
