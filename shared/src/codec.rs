//! XBee API frame codec (API mode 2, escaped)
//!
//! All frames on the serial line are laid out as:
//! ```text
//! [ 0x7E ][ length (u16, big-endian) ][ N bytes: frame data ][ checksum ]
//! ```
//!
//! Every byte after the start delimiter is escaped: `0x7E`, `0x7D`, `0x11`
//! and `0x13` are sent as `0x7D` followed by the byte XOR `0x20`. The length
//! counts unescaped frame data only. The checksum is `0xFF` minus the low
//! byte of the sum of the frame data.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Start delimiter of every frame
pub const START_DELIMITER: u8 = 0x7E;

/// Escape marker; the following byte is XORed with [`ESCAPE_XOR`]
pub const ESCAPE: u8 = 0x7D;

/// Software flow control bytes that must be escaped
pub const XON: u8 = 0x11;
pub const XOFF: u8 = 0x13;

pub const ESCAPE_XOR: u8 = 0x20;

/// Largest frame data length accepted from the radio
pub const MAX_FRAME_LEN: u16 = 512;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_LEN})")]
    FrameTooLarge(usize),

    #[error("Frame data must not be empty")]
    EmptyFrame,

    #[error("Invalid frame length field: {0}")]
    InvalidLength(u16),

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Frame truncated by a new start delimiter")]
    Truncated,

    #[error("Malformed frame 0x{api_id:02X}: {reason}")]
    Malformed { api_id: u8, reason: String },
}

/// Whether a byte must be escaped on the wire
pub fn needs_escape(byte: u8) -> bool {
    matches!(byte, START_DELIMITER | ESCAPE | XON | XOFF)
}

/// Compute the checksum of unescaped frame data
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0xFF - sum
}

fn put_escaped(buf: &mut BytesMut, byte: u8) {
    if needs_escape(byte) {
        buf.put_u8(ESCAPE);
        buf.put_u8(byte ^ ESCAPE_XOR);
    } else {
        buf.put_u8(byte);
    }
}

/// Encode frame data (API identifier first) into an escaped frame
pub fn encode(frame_data: &[u8]) -> Result<Bytes, CodecError> {
    if frame_data.is_empty() {
        return Err(CodecError::EmptyFrame);
    }
    if frame_data.len() > MAX_FRAME_LEN as usize {
        return Err(CodecError::FrameTooLarge(frame_data.len()));
    }

    // Worst case every byte after the delimiter is escaped
    let mut buf = BytesMut::with_capacity(1 + 2 * (frame_data.len() + 3));
    buf.put_u8(START_DELIMITER);

    let len = (frame_data.len() as u16).to_be_bytes();
    put_escaped(&mut buf, len[0]);
    put_escaped(&mut buf, len[1]);

    for byte in frame_data {
        put_escaped(&mut buf, *byte);
    }
    put_escaped(&mut buf, checksum(frame_data));

    Ok(buf.freeze())
}

/// Try to decode one frame from a buffer of raw serial bytes
///
/// Returns:
/// - `Ok(Some(frame_data))` if a complete frame was decoded
/// - `Ok(None)` if more data is needed (nothing consumed past the delimiter)
/// - `Err(...)` if the frame was invalid; its bytes are consumed so the next
///   call resynchronises on the following start delimiter
pub fn decode(buf: &mut BytesMut) -> Result<Option<Bytes>, CodecError> {
    // Drop line noise in front of the delimiter
    match buf.iter().position(|b| *b == START_DELIMITER) {
        Some(0) => {}
        Some(pos) => buf.advance(pos),
        None => {
            buf.clear();
            return Ok(None);
        }
    }

    let mut unescaped: Vec<u8> = Vec::new();
    let mut total_len: Option<usize> = None;
    let mut i = 1;

    loop {
        if let Some(total) = total_len {
            if unescaped.len() == total {
                break;
            }
        }
        if i >= buf.len() {
            return Ok(None);
        }

        let raw = buf[i];
        if raw == START_DELIMITER {
            buf.advance(i);
            return Err(CodecError::Truncated);
        }

        let byte = if raw == ESCAPE {
            if i + 1 >= buf.len() {
                return Ok(None);
            }
            let next = buf[i + 1];
            if next == START_DELIMITER {
                buf.advance(i + 1);
                return Err(CodecError::Truncated);
            }
            i += 2;
            next ^ ESCAPE_XOR
        } else {
            i += 1;
            raw
        };
        unescaped.push(byte);

        if unescaped.len() == 2 {
            let len = u16::from_be_bytes([unescaped[0], unescaped[1]]);
            if len == 0 || len > MAX_FRAME_LEN {
                buf.advance(i);
                return Err(CodecError::InvalidLength(len));
            }
            // length bytes + data + checksum
            total_len = Some(2 + len as usize + 1);
        }
    }

    buf.advance(i);

    let (data, actual) = unescaped[2..].split_at(unescaped.len() - 3);
    let expected = checksum(data);
    if expected != actual[0] {
        return Err(CodecError::ChecksumMismatch {
            expected,
            actual: actual[0],
        });
    }

    Ok(Some(Bytes::copy_from_slice(data)))
}

/// Decoder state machine for streaming decoding
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Raw serial bytes not yet consumed
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete
    /// frames. An error consumes only the bad frame.
    pub fn decode_next(&mut self) -> Result<Option<Bytes>, CodecError> {
        decode(&mut self.buffer)
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
