//! Binary codec for Vail keying events.
//!
//! Wire format:
//! ```text
//! [timestamp_ms:8][peer_count_or_reserved:2][duration_ms:2]*
//! ```
//! Total fixed size: 10 bytes. All multi-byte integers are big-endian.

use thiserror::Error;

use crate::protocol::messages::{
    InboundEvent, OutboundEvent, DURATION_SIZE, EVENT_HEADER_SIZE,
};

/// Errors that can occur while decoding an event payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The payload is shorter than the fixed 10-byte event header.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The duration list does not consist of whole 2-byte values.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`OutboundEvent`] into its wire representation.
///
/// The 2-byte field after the timestamp is reserved on client → relay events
/// and is always written as zero.
///
/// # Examples
///
/// ```rust
/// use vail_core::protocol::{encode_event, OutboundEvent};
///
/// let bytes = encode_event(&OutboundEvent::single(1000, 48));
/// assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0x03, 0xE8, 0, 0, 0, 48]);
/// ```
pub fn encode_event(event: &OutboundEvent) -> Vec<u8> {
    let mut buf = Vec::with_capacity(event.encoded_len());
    buf.extend_from_slice(&event.timestamp_ms.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes()); // reserved
    for duration in &event.durations {
        buf.extend_from_slice(&duration.to_be_bytes());
    }
    buf
}

/// Decodes an [`InboundEvent`] from a complete frame payload.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when the payload is shorter
/// than 10 bytes and [`ProtocolError::MalformedPayload`] when the duration
/// list ends with a dangling odd byte.
///
/// # Examples
///
/// ```rust
/// use vail_core::protocol::decode_event;
///
/// let payload = [0, 0, 0, 0, 0, 0, 0x27, 0x10, 0, 3, 0, 60, 0, 180];
/// let event = decode_event(&payload).unwrap();
/// assert_eq!(event.timestamp_ms, 10_000);
/// assert_eq!(event.peer_count, 3);
/// assert_eq!(event.durations, vec![60, 180]);
/// ```
pub fn decode_event(payload: &[u8]) -> Result<InboundEvent, ProtocolError> {
    require_len(payload, EVENT_HEADER_SIZE)?;

    let timestamp_ms = read_u64(payload, 0)?;
    let peer_count = read_u16(payload, 8)?;

    let tail = &payload[EVENT_HEADER_SIZE..];
    if tail.len() % DURATION_SIZE != 0 {
        return Err(ProtocolError::MalformedPayload(format!(
            "duration list has {} bytes, not a multiple of {DURATION_SIZE}",
            tail.len()
        )));
    }

    let durations = tail
        .chunks_exact(DURATION_SIZE)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    Ok(InboundEvent {
        timestamp_ms,
        peer_count,
        durations,
    })
}

// ── Big-endian helpers ────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        return Err(ProtocolError::InsufficientData {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn read_u64(buf: &[u8], offset: usize) -> Result<u64, ProtocolError> {
    require_len(buf, offset + 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    Ok(u64::from_be_bytes(bytes))
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    require_len(buf, offset + 2)?;
    Ok(u16::from_be_bytes([buf[offset], buf[offset + 1]]))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
