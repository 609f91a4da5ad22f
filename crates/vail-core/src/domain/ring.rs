//! Lock-free single-producer/single-consumer ring buffer for paddle transitions.
//!
//! The producer is the pin interrupt handler; the consumer is the keyer task.
//!
//! # Overflow policy
//!
//! The producer never blocks and never waits for the consumer.  When the
//! consumer falls more than `N` entries behind, the producer keeps writing and
//! the oldest unread entries are overwritten.  The consumer notices the gap,
//! skips over it, and adds the skipped entries to [`PaddleRing::lost`].  The
//! surviving entries are always returned in chronological order.
//!
//! # How overwrites are detected
//!
//! Each slot is one `AtomicU64` holding the event *and* the low 30 bits of
//! the write index that produced it, so a slot is always read or written in a
//! single atomic operation.  If the index stored in a slot is newer than the
//! one the consumer expected, the producer has lapped the consumer and the
//! entry the consumer wanted is gone.
//!
//! # Memory ordering
//!
//! - Producer stores the slot with `Release`, then publishes `head` with `Release`.
//! - Consumer loads `head` with `Acquire` before loading any slot, so every
//!   slot below `head` is visible.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::domain::element::{Contact, PaddleEvent};

/// Default capacity, matching the interrupt buffer of the reference hardware.
pub const DEFAULT_RING_CAPACITY: usize = 64;

const SEQ_BITS: u32 = 30;
const SEQ_MASK: u64 = (1 << SEQ_BITS) - 1;
const SEQ_SHIFT: u32 = 34;
const TS_SHIFT: u32 = 2;
const SOURCE_BIT: u64 = 0b10;
const PRESSED_BIT: u64 = 0b01;

/// SPSC ring of [`PaddleEvent`]s with overwrite-oldest semantics.
///
/// `push` must only ever be called from one context (the interrupt) and `pop`
/// from one other context (the keyer).  Both take `&self` so the ring can be
/// shared through an `Arc` or a `static`.
pub struct PaddleRing<const N: usize = DEFAULT_RING_CAPACITY> {
    slots: [AtomicU64; N],
    /// Total number of events ever pushed.
    head: AtomicUsize,
    /// Total number of slots consumed or skipped.
    tail: AtomicUsize,
    lost: AtomicUsize,
}

impl<const N: usize> PaddleRing<N> {
    /// Creates an empty ring.
    ///
    /// # Panics
    ///
    /// Panics if `N` is zero.
    pub fn new() -> Self {
        assert!(N > 0, "ring capacity must be non-zero");
        Self {
            slots: std::array::from_fn(|_| AtomicU64::new(0)),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            lost: AtomicUsize::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Appends an event.  Producer side; never blocks.
    pub fn push(&self, event: PaddleEvent) {
        let head = self.head.load(Ordering::Relaxed);
        self.slots[head % N].store(pack(head, event), Ordering::Release);
        self.head.store(head.wrapping_add(1), Ordering::Release);
    }

    /// Removes the oldest unread event.  Consumer side; never blocks.
    pub fn pop(&self) -> Option<PaddleEvent> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let mut tail = self.tail.load(Ordering::Relaxed);
            if tail == head {
                return None;
            }

            let behind = head.wrapping_sub(tail);
            if behind > N {
                let skipped = behind - N;
                self.lost.fetch_add(skipped, Ordering::Relaxed);
                tail = tail.wrapping_add(skipped);
            }

            let raw = self.slots[tail % N].load(Ordering::Acquire);
            self.tail.store(tail.wrapping_add(1), Ordering::Relaxed);

            if (raw >> SEQ_SHIFT) & SEQ_MASK == tail as u64 & SEQ_MASK {
                return Some(unpack(raw));
            }
            // Overwritten between the head load and the slot load.
            self.lost.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of events overwritten before the consumer could read them.
    pub fn lost(&self) -> usize {
        self.lost.load(Ordering::Relaxed)
    }

    /// Whether there is nothing to read right now.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for PaddleRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn pack(seq: usize, event: PaddleEvent) -> u64 {
    let mut raw = (seq as u64 & SEQ_MASK) << SEQ_SHIFT;
    raw |= u64::from(event.timestamp_ms) << TS_SHIFT;
    if event.source == Contact::Dah {
        raw |= SOURCE_BIT;
    }
    if event.pressed {
        raw |= PRESSED_BIT;
    }
    raw
}

fn unpack(raw: u64) -> PaddleEvent {
    PaddleEvent {
        timestamp_ms: (raw >> TS_SHIFT) as u32,
        pressed: raw & PRESSED_BIT != 0,
        source: if raw & SOURCE_BIT != 0 {
            Contact::Dah
        } else {
            Contact::Dit
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
