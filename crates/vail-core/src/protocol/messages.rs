//! Event types carried inside transport frames.
//!
//! Wire format (both directions):
//! ```text
//! [timestamp_ms:8][peer_count_or_reserved:2][duration_ms:2]*
//! ```
//! All multi-byte integers are big-endian.  The 2-byte field after the
//! timestamp is always zero on client → relay events and carries the number
//! of connected stations on relay → client events.

/// Size of the fixed part of every event payload (timestamp + 2-byte field).
pub const EVENT_HEADER_SIZE: usize = 10;

/// Size of one encoded duration.
pub const DURATION_SIZE: usize = 2;

/// An event this client transmits to the relay.
///
/// Every current producer emits exactly one duration per event (one keyed
/// element), but the wire format allows a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    /// Wall-clock time at which keying started, in Unix epoch milliseconds.
    pub timestamp_ms: u64,
    /// Tone durations in milliseconds.
    pub durations: Vec<u16>,
}

impl OutboundEvent {
    /// Builds an event carrying a single keyed element.
    pub fn single(timestamp_ms: u64, duration_ms: u16) -> Self {
        Self {
            timestamp_ms,
            durations: vec![duration_ms],
        }
    }

    /// Number of bytes this event occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        EVENT_HEADER_SIZE + self.durations.len() * DURATION_SIZE
    }
}

/// An event decoded from a relay → client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Remote wall-clock time in Unix epoch milliseconds.
    pub timestamp_ms: u64,
    /// Number of stations currently connected to the channel.
    pub peer_count: u16,
    /// Tone durations in milliseconds, alternating ON/OFF starting with ON.
    pub durations: Vec<u16>,
}

/// Classification of an inbound event by the number of durations it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// No durations: the relay only reports the peer count.
    Heartbeat,
    /// Exactly one duration: a single keyed element, possibly our own echo.
    Single(u16),
    /// Two or more durations: a playback sequence.
    Sequence,
}

impl InboundEvent {
    /// Returns how the receive pipeline should treat this event.
    pub fn kind(&self) -> InboundKind {
        match self.durations.as_slice() {
            [] => InboundKind::Heartbeat,
            [only] => InboundKind::Single(*only),
            _ => InboundKind::Sequence,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
