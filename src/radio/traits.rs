//! Radio trait abstraction for the poll cycle

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokenrelay_shared::{codec::CodecError, RadioResponse, TxRequest16};

/// Errors raised by the radio transport
#[derive(Error, Debug)]
pub enum RadioError {
    #[error("No TX status within {0:?}")]
    Timeout(Duration),

    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame error: {0}")]
    Codec(#[from] CodecError),

    #[error("Radio port closed")]
    Closed,
}

/// A radio that can send a request and wait for its acknowledgment
#[async_trait]
pub trait Radio: Send {
    /// Allocate the correlation id for the next request
    fn next_frame_id(&mut self) -> u8;

    /// Send `request` and wait up to `timeout` for the response that answers it
    async fn send_synchronous(
        &mut self,
        request: &TxRequest16,
        timeout: Duration,
    ) -> Result<RadioResponse, RadioError>;

    /// Next inbound frame, waiting at most `wait`; `Ok(None)` if nothing arrived
    async fn next_response(&mut self, wait: Duration) -> Result<Option<RadioResponse>, RadioError>;
}
