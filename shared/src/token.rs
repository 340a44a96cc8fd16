//! Token decoding
//!
//! Tokens arrive from the server as hex text. Only a short prefix of the
//! decoded bytes travels over the air.

use bytes::Bytes;
use thiserror::Error;

use crate::radio::MAX_PAYLOAD_LEN;

/// Errors produced while turning a token into a radio payload
// FromHexError is PartialEq only
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Token is empty")]
    Empty,

    #[error("Token has odd length {0}")]
    OddLength(usize),

    #[error("Token is not hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Token too short: need {needed} bytes, have {available}")]
    TooShort { needed: usize, available: usize },

    #[error("Payload length {0} outside 1..={MAX_PAYLOAD_LEN}")]
    InvalidPayloadLen(usize),
}

/// Bytes carried by a token transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioPayload(Bytes);

impl RadioPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// Decode `token` and keep its first `payload_len` bytes
pub fn decode_token(token: &str, payload_len: usize) -> Result<RadioPayload, DecodeError> {
    if payload_len == 0 || payload_len > MAX_PAYLOAD_LEN {
        return Err(DecodeError::InvalidPayloadLen(payload_len));
    }
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }
    if token.len() % 2 != 0 {
        return Err(DecodeError::OddLength(token.len()));
    }

    let decoded = hex::decode(token)?;
    if decoded.len() < payload_len {
        return Err(DecodeError::TooShort {
            needed: payload_len,
            available: decoded.len(),
        });
    }

    Ok(RadioPayload(Bytes::copy_from_slice(&decoded[..payload_len])))
}
