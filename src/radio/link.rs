//! Framed link to the local XBee

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokenrelay_shared::{
    codec::{self, FrameDecoder},
    RadioResponse, TxRequest16,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{Radio, RadioError};

/// Unsolicited frames kept for the relay step; the oldest are dropped beyond this
pub const PENDING_LIMIT: usize = 64;

/// XBee API link over any byte stream (serial port, or an in-memory pipe in tests)
pub struct RadioLink<S> {
    stream: S,
    decoder: FrameDecoder,
    /// Unsolicited frames read while waiting for a TX status
    pending: VecDeque<RadioResponse>,
    last_frame_id: u8,
    read_buf: Vec<u8>,
}

impl<S> RadioLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            last_frame_id: 0,
            read_buf: vec![0u8; 256],
        }
    }

    /// Read until one complete frame is decoded
    async fn read_frame(&mut self) -> Result<RadioResponse, RadioError> {
        loop {
            if let Some(frame) = self.decoder.decode_next()? {
                return Ok(RadioResponse::parse(&frame)?);
            }

            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(RadioError::Closed);
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }

    fn queue_unsolicited(&mut self, response: RadioResponse) {
        if self.pending.len() >= PENDING_LIMIT {
            if let Some(dropped) = self.pending.pop_front() {
                warn!("[RADIO] Receive queue full, dropping {}", dropped);
            }
        }
        self.pending.push_back(response);
    }

    /// Read frames until one carrying a frame id arrives, queueing the rest
    async fn read_frame_id_response(&mut self) -> Result<RadioResponse, RadioError> {
        loop {
            let response = match self.read_frame().await {
                Ok(response) => response,
                Err(RadioError::Codec(e)) => {
                    warn!("[RADIO] Dropping bad frame: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if response.frame_id().is_some() {
                return Ok(response);
            }

            debug!("[RADIO] Queued while waiting for TX status: {}", response);
            self.queue_unsolicited(response);
        }
    }
}

#[async_trait]
impl<S> Radio for RadioLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn next_frame_id(&mut self) -> u8 {
        // 0 would suppress the TX status
        self.last_frame_id = match self.last_frame_id {
            u8::MAX => 1,
            id => id + 1,
        };
        self.last_frame_id
    }

    async fn send_synchronous(
        &mut self,
        request: &TxRequest16,
        wait: Duration,
    ) -> Result<RadioResponse, RadioError> {
        let frame = codec::encode(&request.to_frame_data())?;
        debug!("[RADIO] -> {}", hex::encode_upper(&frame));

        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;

        timeout(wait, self.read_frame_id_response())
            .await
            .map_err(|_| RadioError::Timeout(wait))?
    }

    async fn next_response(&mut self, wait: Duration) -> Result<Option<RadioResponse>, RadioError> {
        if let Some(response) = self.pending.pop_front() {
            return Ok(Some(response));
        }

        match timeout(wait, self.read_frame()).await {
            Ok(Ok(response)) => Ok(Some(response)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }
}
