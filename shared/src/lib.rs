//! Token Relay Shared Types
//!
//! This crate provides the XBee API framing, the radio frame types and the
//! delivery logic shared by the base station: token decoding, freshness
//! tracking and acknowledgment classification.

pub mod api;
pub mod codec;
pub mod outcome;
pub mod record;
pub mod token;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use api::{Address16, ApiId, RadioResponse, TxRequest16, TxStatus, TxStatusCode};
pub use outcome::{
    classify, CorrelationMismatch, DeliveryCounters, FailureReason, StatusFlags, TxOutcome,
};
pub use record::{AuthRequestRecord, Watermark};
pub use token::{decode_token, DecodeError, RadioPayload};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing parameters for the relay
pub mod timing {
    /// Delay between the end of one poll cycle and the start of the next
    pub const POLL_INTERVAL_MS: u64 = 2000;

    /// How long a synchronous radio send waits for its TX status
    pub const SEND_TIMEOUT_MS: u64 = 5000;

    /// How long each cycle listens for inbound telemetry before polling
    pub const RECEIVE_WINDOW_MS: u64 = 250;

    /// HTTP request timeout for the token server
    pub const HTTP_TIMEOUT_MS: u64 = 10_000;
}

/// Radio parameters
pub mod radio {
    /// Number of token bytes carried in a transmission
    pub const DEFAULT_PAYLOAD_LEN: usize = 2;

    /// Largest payload a deployment may be configured for
    pub const MAX_PAYLOAD_LEN: usize = 3;

    /// Default serial baud rate of the XBee module
    pub const DEFAULT_BAUD_RATE: u32 = 9600;

    /// Payload that switches the remote LED on
    pub const LED_ON: u8 = 0xFF;

    /// Payload that switches the remote LED off
    pub const LED_OFF: u8 = 0x00;
}
