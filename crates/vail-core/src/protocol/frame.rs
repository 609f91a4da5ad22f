//! Transport framing for events exchanged with the relay.
//!
//! Events travel inside WebSocket data frames (RFC 6455 §5.2):
//! ```text
//! [FIN|RSV|opcode:1][MASK|len7:1][ext_len:0/2/8][mask_key:0/4][payload:N]
//! ```
//!
//! # Asymmetric framing (for beginners)
//!
//! The two directions are framed differently:
//!
//! - **Client → relay** frames must be *masked*: every payload byte is XORed
//!   with one of four random key bytes, cycling over the key.  The key travels
//!   in the frame header so the relay can undo it.  Our events are 12 bytes
//!   long, so the encoder only implements the short length form (payload
//!   under 126 bytes) and rejects anything larger instead of corrupting the
//!   length byte.
//!
//! - **Relay → client** frames are unmasked, but may use any of the three
//!   length forms: a 7-bit length, a 16-bit extended length (code 126), or a
//!   64-bit extended length (code 127).  The decoder supports all three.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// First header byte of every client frame: FIN set, opcode binary.
pub const FIN_BINARY: u8 = 0x82;

/// Bit in the second header byte that announces a masking key.
pub const MASK_BIT: u8 = 0x80;

/// Largest payload expressible with the short (7-bit) length form.
pub const MAX_SHORT_PAYLOAD: usize = 125;

/// Largest payload the decoder accepts before treating the stream as broken.
pub const MAX_FRAME_PAYLOAD: u64 = 1 << 20;

const LEN_CODE_16: u8 = 126;
const LEN_CODE_64: u8 = 127;

/// Errors that can occur while encoding or reading a transport frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The client encoder only supports the short length form.
    #[error("payload of {len} bytes exceeds the short-form limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// The relay declared a payload larger than the decoder is willing to buffer.
    #[error("declared payload length {declared} exceeds limit {max}")]
    DeclaredLengthTooLarge { declared: u64, max: u64 },

    /// The stream ended cleanly before the first byte of a frame.
    #[error("stream closed")]
    Closed,

    /// The stream failed or ended in the middle of a frame.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// WebSocket frame opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    /// Reserved opcodes; carried through so the caller can ignore them.
    Reserved(u8),
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Opcode::Continuation,
            0x1 => Opcode::Text,
            0x2 => Opcode::Binary,
            0x8 => Opcode::Close,
            0x9 => Opcode::Ping,
            0xA => Opcode::Pong,
            other => Opcode::Reserved(other),
        }
    }
}

/// Which length encoding a decoded frame used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthForm {
    /// Length fits in the 7 low bits of the second header byte.
    Short,
    /// Length code 126 followed by a big-endian `u16`.
    Extended16,
    /// Length code 127 followed by a big-endian `u64`.
    Extended64,
}

/// A complete frame read from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub length_form: LengthForm,
    /// Payload with any masking already removed.
    pub payload: Vec<u8>,
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// XORs `buf` in place with `mask`, cycling over the four key bytes.
///
/// Applying the same mask twice restores the original bytes.
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Wraps `payload` in a masked, final, binary client frame.
///
/// The caller supplies the masking key so that it can draw a fresh random key
/// per frame (and so tests can use a fixed one).
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] for payloads of 126 bytes or more.
///
/// # Examples
///
/// ```rust
/// use vail_core::protocol::frame::encode_client_frame;
///
/// let frame = encode_client_frame(&[1, 2, 3], [0xFF, 0, 0, 0]).unwrap();
/// assert_eq!(frame, [0x82, 0x83, 0xFF, 0, 0, 0, 0xFE, 2, 3]);
/// ```
pub fn encode_client_frame(payload: &[u8], mask: [u8; 4]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_SHORT_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_SHORT_PAYLOAD,
        });
    }

    let mut buf = Vec::with_capacity(2 + 4 + payload.len());
    buf.push(FIN_BINARY);
    buf.push(MASK_BIT | payload.len() as u8);
    buf.extend_from_slice(&mask);

    let body_start = buf.len();
    buf.extend_from_slice(payload);
    apply_mask(&mut buf[body_start..], mask);
    Ok(buf)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Reads exactly one frame from `reader`.
///
/// Extended 16-bit and 64-bit lengths are read before the payload.  A masking
/// key, if present, is removed from the payload before it is returned.
///
/// # Errors
///
/// - [`FrameError::Closed`] if the stream ends before the first header byte.
/// - [`FrameError::Io`] if the stream fails or ends mid-frame.
/// - [`FrameError::DeclaredLengthTooLarge`] if the length exceeds
///   [`MAX_FRAME_PAYLOAD`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let b0 = match reader.read_u8().await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::Closed)
        }
        Err(e) => return Err(FrameError::Io(e)),
    };
    let b1 = reader.read_u8().await?;

    let fin = b0 & 0x80 != 0;
    let opcode = Opcode::from(b0);
    let masked = b1 & MASK_BIT != 0;

    let (length_form, payload_len) = match b1 & 0x7F {
        LEN_CODE_16 => (LengthForm::Extended16, u64::from(reader.read_u16().await?)),
        LEN_CODE_64 => (LengthForm::Extended64, reader.read_u64().await?),
        short => (LengthForm::Short, u64::from(short)),
    };

    if payload_len > MAX_FRAME_PAYLOAD {
        return Err(FrameError::DeclaredLengthTooLarge {
            declared: payload_len,
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let mask = if masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).await?;
    if let Some(key) = mask {
        apply_mask(&mut payload, key);
    }

    trace!(?opcode, ?length_form, len = payload_len, "frame read");

    Ok(Frame {
        fin,
        opcode,
        length_form,
        payload,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
