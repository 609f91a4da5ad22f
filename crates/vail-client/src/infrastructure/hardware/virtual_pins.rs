//! Host hardware: software pin bank plus the shared tone driver.
//!
//! # How the pieces fit (for beginners)
//!
//! On a microcontroller the paddles are two GPIO pins and an interrupt fires
//! on every edge.  Here the pins are two atomics in a [`PinBank`].  Whatever
//! drives them (the line driver below, a serial adapter, a test) calls
//! [`PinHandle::set_level`] from its own thread.  That call behaves like the
//! interrupt handler: it stores the level and, once interrupts are enabled,
//! pushes a [`PaddleEvent`] into the lock-free [`PaddleRing`] without ever
//! blocking.
//!
//! The keyer, on the tokio thread, reads levels and drains the ring through
//! the [`Hardware`] trait implemented by [`VirtualPins`].

use std::cell::Cell;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use vail_core::{Contact, PaddleEvent, PaddleRing, PaddleState, Polarity};

use super::tone::ToneDriver;
use crate::application::hardware::Hardware;

/// Raw pin levels and the interrupt ring, shared with the driver thread.
struct PinBank {
    dit_high: AtomicBool,
    dah_high: AtomicBool,
    irq_enabled: AtomicBool,
    ring: PaddleRing,
    polarity: Polarity,
    origin: Instant,
}

impl PinBank {
    fn level(&self, contact: Contact) -> &AtomicBool {
        match contact {
            Contact::Dit => &self.dit_high,
            Contact::Dah => &self.dah_high,
        }
    }

    fn pressed(&self, contact: Contact) -> bool {
        self.polarity
            .is_pressed(self.level(contact).load(Ordering::Acquire))
    }
}

/// Producer side of the pin bank.  Cheap to clone and `Send`.
#[derive(Clone)]
pub struct PinHandle {
    bank: Arc<PinBank>,
}

impl PinHandle {
    /// Drives `contact` to the raw electrical level `high`.
    ///
    /// Acts as the edge interrupt: a level change is recorded in the ring
    /// when interrupts are enabled.
    pub fn set_level(&self, contact: Contact, high: bool) {
        let previous = self.bank.level(contact).swap(high, Ordering::AcqRel);
        if previous == high || !self.bank.irq_enabled.load(Ordering::Acquire) {
            return;
        }
        self.bank.ring.push(PaddleEvent {
            // Wraps like a hardware millisecond tick counter.
            timestamp_ms: self.bank.origin.elapsed().as_millis() as u32,
            pressed: self.bank.polarity.is_pressed(high),
            source: contact,
        });
    }

    /// Presses or releases `contact`, translating through the polarity.
    pub fn press(&self, contact: Contact, pressed: bool) {
        self.set_level(contact, self.bank.polarity.level_for(pressed));
    }
}

/// Host implementation of [`Hardware`].
pub struct VirtualPins {
    bank: Arc<PinBank>,
    tone: ToneDriver,
    indicator: Cell<bool>,
    lost_seen: AtomicUsize,
}

impl VirtualPins {
    /// Creates a pin bank with both contacts released.
    pub fn new(polarity: Polarity, tone: ToneDriver) -> (Self, PinHandle) {
        let released = polarity.level_for(false);
        let bank = Arc::new(PinBank {
            dit_high: AtomicBool::new(released),
            dah_high: AtomicBool::new(released),
            irq_enabled: AtomicBool::new(false),
            ring: PaddleRing::new(),
            polarity,
            origin: Instant::now(),
        });
        let handle = PinHandle {
            bank: Arc::clone(&bank),
        };
        let pins = Self {
            bank,
            tone,
            indicator: Cell::new(false),
            lost_seen: AtomicUsize::new(0),
        };
        (pins, handle)
    }

    pub fn tone(&self) -> &ToneDriver {
        &self.tone
    }

    pub fn indicator(&self) -> bool {
        self.indicator.get()
    }
}

impl Hardware for VirtualPins {
    fn read_paddles(&self) -> PaddleState {
        PaddleState::new(
            self.bank.pressed(Contact::Dit),
            self.bank.pressed(Contact::Dah),
        )
    }

    fn enable_interrupts(&self) {
        info!("enabling paddle interrupts");
        self.bank.irq_enabled.store(true, Ordering::Release);
    }

    fn poll_ring_buffer(&self) -> Option<PaddleEvent> {
        let event = self.bank.ring.pop();
        let lost = self.bank.ring.lost();
        let seen = self.lost_seen.swap(lost, Ordering::Relaxed);
        if lost > seen {
            debug!(overwritten = lost - seen, "interrupt ring overran");
        }
        event
    }

    fn tx_tone(&self, on: bool) {
        self.tone.tx(on);
    }

    fn rx_tone(&self, on: bool) {
        self.tone.rx(on);
    }

    fn set_indicator(&self, on: bool) {
        if self.indicator.replace(on) != on {
            debug!(on, "indicator");
        }
    }
}

// ── Line driver ───────────────────────────────────────────────────────────────

/// Parses one driver command: `dit down`, `dit up`, `dah down`, `dah up`.
pub fn parse_command(line: &str) -> Option<(Contact, bool)> {
    let mut words = line.split_whitespace();
    let contact = match words.next()? {
        "dit" => Contact::Dit,
        "dah" => Contact::Dah,
        _ => return None,
    };
    let pressed = match words.next()? {
        "down" => true,
        "up" => false,
        _ => return None,
    };
    words.next().is_none().then_some((contact, pressed))
}

/// Feeds paddle commands read line by line from `input` into the pins, on a
/// dedicated OS thread.
///
/// Lets any line-oriented key adapter (or a terminal) act as the paddle.
pub fn spawn_line_driver<R>(handle: PinHandle, input: R) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "paddle input failed");
                    break;
                }
            };
            match parse_command(&line) {
                Some((contact, pressed)) => handle.press(contact, pressed),
                None if line.trim().is_empty() => {}
                None => warn!(%line, "unknown paddle command"),
            }
        }
        debug!("paddle input closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins(polarity: Polarity) -> (VirtualPins, PinHandle) {
        VirtualPins::new(polarity, ToneDriver::new(600, 700).unwrap())
    }

    #[test]
    fn test_starts_released_for_both_polarities() {
        for polarity in [Polarity::ActiveHigh, Polarity::ActiveLow] {
            let (pins, _) = pins(polarity);
            assert_eq!(pins.read_paddles(), PaddleState::RELEASED);
        }
    }

    #[test]
    fn test_active_low_low_level_is_pressed() {
        // Arrange
        let (pins, handle) = pins(Polarity::ActiveLow);

        // Act
        handle.set_level(Contact::Dah, false);

        // Assert
        assert_eq!(pins.read_paddles(), PaddleState::new(false, true));
    }

    #[test]
    fn test_no_events_before_interrupts_enabled() {
        let (pins, handle) = pins(Polarity::ActiveHigh);

        handle.press(Contact::Dit, true);

        assert!(pins.poll_ring_buffer().is_none());
        assert!(pins.read_paddles().dit);
    }

    #[test]
    fn test_edges_are_captured_in_order() {
        // Arrange
        let (pins, handle) = pins(Polarity::ActiveLow);
        pins.enable_interrupts();

        // Act
        handle.press(Contact::Dit, true);
        handle.press(Contact::Dit, true); // no edge
        handle.press(Contact::Dit, false);

        // Assert
        let first = pins.poll_ring_buffer().unwrap();
        let second = pins.poll_ring_buffer().unwrap();
        assert!(first.pressed && first.source == Contact::Dit);
        assert!(!second.pressed);
        assert!(pins.poll_ring_buffer().is_none());
    }

    #[test]
    fn test_indicator_and_tones_reach_driver() {
        use super::super::tone::ToneState;

        let (pins, _) = pins(Polarity::ActiveHigh);

        pins.set_indicator(true);
        pins.rx_tone(true);

        assert!(pins.indicator());
        assert_eq!(pins.tone().state(), ToneState::On { hz: 700 });
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("dit down"), Some((Contact::Dit, true)));
        assert_eq!(parse_command("  dah   up "), Some((Contact::Dah, false)));
        assert_eq!(parse_command("dah sideways"), None);
        assert_eq!(parse_command("dit down now"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_line_driver_applies_commands() {
        let (pins, handle) = pins(Polarity::ActiveHigh);
        let input = std::io::Cursor::new("dah down\nbogus\n\ndit down\ndit up\n");

        spawn_line_driver(handle, input).join().unwrap();

        assert_eq!(pins.read_paddles(), PaddleState::new(false, true));
    }
}
