//! Bounded history of transmitted elements, used for echo cancellation.
//!
//! # Why is this needed? (for beginners)
//!
//! The relay broadcasts every event to every station in the channel,
//! including the station that sent it.  Without filtering, we would hear our
//! own keying played back a few seconds later.  Each transmitted element is
//! recorded here; an inbound single-element event whose timestamp is within
//! [`ECHO_WINDOW_MS`] of a recorded one and whose duration is identical is
//! recognised as our echo and dropped.
//!
//! Echoes arrive in the order they were sent, so a match also discards every
//! older entry in front of it: those were either already matched or lost.

use std::collections::VecDeque;

/// Number of transmitted elements remembered.
pub const HISTORY_CAPACITY: usize = 10;

/// Maximum timestamp distance (exclusive) for an echo match.
pub const ECHO_WINDOW_MS: u64 = 200;

/// One transmitted element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentEntry {
    pub timestamp_ms: u64,
    pub duration_ms: u16,
}

/// Insertion-ordered FIFO of recently transmitted elements.
#[derive(Debug, Clone, Default)]
pub struct SentHistory {
    entries: VecDeque<SentEntry>,
}

impl SentHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Records a transmitted element, evicting the oldest entry when full.
    pub fn record(&mut self, timestamp_ms: u64, duration_ms: u16) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(SentEntry {
            timestamp_ms,
            duration_ms,
        });
    }

    /// Checks whether an inbound single-element event is our own echo.
    ///
    /// On a match every entry up to and including the matched one is removed
    /// and `true` is returned.  Without a match the history is unchanged.
    pub fn take_echo(&mut self, timestamp_ms: u64, duration_ms: u16) -> bool {
        let hit = self.entries.iter().position(|e| {
            e.duration_ms == duration_ms && e.timestamp_ms.abs_diff(timestamp_ms) < ECHO_WINDOW_MS
        });

        match hit {
            Some(index) => {
                self.entries.drain(..=index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &SentEntry> {
        self.entries.iter()
    }
}
