//! Keyer engine: turns paddle levels into timed elements.
//!
//! # Modes (for beginners)
//!
//! The mode is chosen once, from the paddle levels sampled at boot before
//! interrupts are enabled, and never changes during a session:
//!
//! - **Straight key** – the operator holds a paddle down while the client
//!   boots.  That contact is then treated as a plain key: the tone follows
//!   the contact, and every press longer than the debounce floor becomes one
//!   [`ElementKind::Manual`] element.
//!
//! - **Iambic** – no paddle held at boot.  The keyer keeps two sticky
//!   latches, one per paddle, and plays dits and dahs of fixed length.
//!   Squeezing both paddles alternates dit and dah.
//!
//! # Mode A vs Mode B
//!
//! In **Mode B** the opposite paddle is also sampled while an element is
//! sounding and during the following space.  A brief squeeze during a dit
//! therefore queues a dah even if the dah paddle is released before the dit
//! ends.  **Mode A** skips this sampling: only paddles still held at the end
//! of the cycle are latched.
//!
//! Every element is stamped with the wall-clock time at which its tone
//! started and handed to the [`Outbox`].  The keyer never fails; with no
//! latch to resolve it simply polls again.

use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, trace};
use vail_core::domain::timing::{DEBOUNCE_FLOOR_MS, POLL_INTERVAL_MS};
use vail_core::{Contact, Element, ElementKind, EpochAnchor, KeyElement, KeyerTiming, PaddleState};

use super::hardware::Hardware;
use super::outbox::Outbox;
use super::session::LocalClock;

/// Keying discipline for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyerMode {
    /// Straight key on the given contact.
    Straight(Contact),
    Iambic,
}

impl KeyerMode {
    /// Selects the mode from the paddle levels read at boot.
    ///
    /// A held dit paddle wins over a held dah paddle.
    pub fn select(boot: PaddleState) -> Self {
        if boot.dit {
            KeyerMode::Straight(Contact::Dit)
        } else if boot.dah {
            KeyerMode::Straight(Contact::Dah)
        } else {
            KeyerMode::Iambic
        }
    }
}

/// Squeeze-memory policy of the iambic keyer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IambicMode {
    A,
    #[default]
    B,
}

/// Sticky "want dit" / "want dah" flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latches {
    pub dit: bool,
    pub dah: bool,
}

impl Latches {
    /// Sets the latch of every pressed paddle.  Released paddles leave their
    /// latch untouched.
    pub fn absorb(&mut self, paddles: PaddleState) {
        self.dit |= paddles.dit;
        self.dah |= paddles.dah;
    }

    pub fn set(&mut self, element: Element) {
        match element {
            Element::Dit => self.dit = true,
            Element::Dah => self.dah = true,
        }
    }

    pub fn clear(&mut self, element: Element) {
        match element {
            Element::Dit => self.dit = false,
            Element::Dah => self.dah = false,
        }
    }

    /// The element to key next, given the previously keyed element.
    ///
    /// With both latches set the result is the opposite of `last`; a squeeze
    /// with no previous element starts with a dit.
    pub fn resolve(&self, last: Option<Element>) -> Option<Element> {
        match (self.dit, self.dah) {
            (true, false) => Some(Element::Dit),
            (false, true) => Some(Element::Dah),
            (true, true) => Some(last.map_or(Element::Dit, Element::opposite)),
            (false, false) => None,
        }
    }
}

/// The keyer task.
pub struct Keyer<H: Hardware> {
    hw: Rc<H>,
    outbox: Outbox,
    clock: LocalClock,
    anchor: EpochAnchor,
    timing: KeyerTiming,
    iambic_mode: IambicMode,
}

impl<H: Hardware> Keyer<H> {
    pub fn new(
        hw: Rc<H>,
        outbox: Outbox,
        clock: LocalClock,
        anchor: EpochAnchor,
        timing: KeyerTiming,
        iambic_mode: IambicMode,
    ) -> Self {
        Self {
            hw,
            outbox,
            clock,
            anchor,
            timing,
            iambic_mode,
        }
    }

    /// Runs the keyer in `mode` for the rest of the session.
    pub async fn run(self, mode: KeyerMode) {
        match mode {
            KeyerMode::Straight(contact) => self.run_straight(contact).await,
            KeyerMode::Iambic => self.run_iambic().await,
        }
    }

    // ── Straight key ─────────────────────────────────────────────────────────

    async fn run_straight(&self, contact: Contact) {
        info!(?contact, "keyer mode: straight key");
        let mut press_start: Option<u64> = None;

        loop {
            let pressed = self.hw.read_paddles().is_active(contact);
            let now = self.clock.now_ms();

            match (pressed, press_start) {
                (true, None) => {
                    press_start = Some(now);
                    self.hw.tx_tone(true);
                    debug!(at_ms = now, "key down");
                }
                (false, Some(start)) => {
                    press_start = None;
                    self.hw.tx_tone(false);
                    let held_ms = now - start;
                    debug!(held_ms, "key up");

                    if held_ms > DEBOUNCE_FLOOR_MS {
                        self.outbox.submit(KeyElement {
                            kind: ElementKind::Manual,
                            duration_ms: u16::try_from(held_ms).unwrap_or(u16::MAX),
                            started_at_ms: self.anchor.to_epoch_ms(start),
                        });
                    } else {
                        debug!(held_ms, "bounce dropped");
                    }
                }
                _ => {}
            }

            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    // ── Iambic ───────────────────────────────────────────────────────────────

    async fn run_iambic(&self) {
        info!(
            wpm = self.timing.wpm(),
            dot_ms = self.timing.dot_ms(),
            mode = ?self.iambic_mode,
            "keyer mode: iambic"
        );
        let mut latches = Latches::default();
        let mut last: Option<Element> = None;

        loop {
            self.drain_interrupts();
            latches.absorb(self.hw.read_paddles());

            let Some(element) = latches.resolve(last) else {
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                continue;
            };

            last = Some(element);
            latches.clear(element);
            self.key_element(element, &mut latches).await;
        }
    }

    /// Empties the interrupt ring.
    ///
    /// The levels read right after are authoritative; the captured
    /// transitions only prove that the ring keeps up with the paddles.
    fn drain_interrupts(&self) {
        let mut drained = 0usize;
        while self.hw.poll_ring_buffer().is_some() {
            drained += 1;
        }
        if drained > 0 {
            trace!(drained, "interrupt events drained");
        }
    }

    /// Sounds `element`, queues it, and waits out the following space.
    async fn key_element(&self, element: Element, latches: &mut Latches) {
        let duration_ms = self.timing.duration_of(element);

        self.hw.tx_tone(true);
        let start = self.clock.now_ms();
        self.outbox.submit(KeyElement {
            kind: element.into(),
            duration_ms,
            started_at_ms: self.anchor.to_epoch_ms(start),
        });

        self.watch_opposite(element, start + u64::from(duration_ms), latches)
            .await;
        self.hw.tx_tone(false);

        let space_end = self.clock.now_ms() + u64::from(self.timing.space_ms());
        self.watch_opposite(element, space_end, latches).await;

        // Paddles still held at the boundary are not lost.
        latches.absorb(self.hw.read_paddles());
    }

    /// Sleeps until `until_ms`, latching the opposite paddle in Mode B.
    async fn watch_opposite(&self, element: Element, until_ms: u64, latches: &mut Latches) {
        let opposite = element.opposite();
        loop {
            let now = self.clock.now_ms();
            if now >= until_ms {
                return;
            }
            if self.iambic_mode == IambicMode::B && self.hw.read_paddles().keys(opposite) {
                latches.set(opposite);
            }
            let step = (until_ms - now).min(POLL_INTERVAL_MS);
            sleep(Duration::from_millis(step)).await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
