//! One poll-and-dispatch cycle and the loop that repeats it

use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tokenrelay_shared::{
    classify, decode_token, now_ms, Address16, AuthRequestRecord, CorrelationMismatch,
    DeliveryCounters, TxOutcome, TxRequest16, Watermark,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use super::relay::{relay_received, RelayCounters};
use crate::config::AppConfig;
use crate::radio::{Radio, RadioError};
use crate::server::TokenServer;

/// Fixed parameters of a cycle
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub payload_len: usize,
    pub destination: Address16,
    pub send_timeout: Duration,
    pub relay_enabled: bool,
    pub receive_window: Duration,
}

impl From<&AppConfig> for CycleSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            payload_len: config.radio.payload_len,
            destination: Address16(config.radio.destination),
            send_timeout: Duration::from_millis(config.radio.send_timeout_ms),
            relay_enabled: config.relay.enabled,
            receive_window: Duration::from_millis(config.relay.receive_window_ms),
        }
    }
}

/// State carried from one cycle to the next
#[derive(Debug, Clone)]
pub struct PollState {
    pub watermark: Watermark,
    pub counters: DeliveryCounters,
    pub relay: RelayCounters,
}

impl PollState {
    pub fn new(watermark: Watermark) -> Self {
        Self {
            watermark,
            counters: DeliveryCounters::new(),
            relay: RelayCounters::default(),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Watermark::starting_now())
    }
}

/// What became of the polled record in one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    FetchFailed,
    /// Record not newer than the watermark
    NotFresh,
    DecodeFailed,
    TimedOut,
    RadioFailed,
    Mismatch(CorrelationMismatch),
    Sent(TxOutcome),
}

/// Run one cycle: relay inbound packets, poll, transmit a fresh token, advance
/// the watermark
pub async fn run_cycle<S, R>(
    server: &S,
    radio: &mut R,
    settings: &CycleSettings,
    state: &mut PollState,
) -> Dispatch
where
    S: TokenServer + ?Sized,
    R: Radio + ?Sized,
{
    if settings.relay_enabled {
        relay_received(server, radio, settings.receive_window, &mut state.relay).await;
    }

    let dispatch = match server.fetch_request().await {
        Err(e) => {
            warn!("[POLL] Fetch failed: {}", e);
            Dispatch::FetchFailed
        }
        Ok(record) if !state.watermark.is_fresh(&record) => {
            debug!(
                "[POLL] Request from {} is not newer than {}",
                record.created_at_ms,
                state.watermark.last_seen_ms()
            );
            Dispatch::NotFresh
        }
        Ok(record) => dispatch_record(&record, radio, settings, &mut state.counters).await,
    };

    state.watermark.advance_to(now_ms());
    dispatch
}

async fn dispatch_record<R>(
    record: &AuthRequestRecord,
    radio: &mut R,
    settings: &CycleSettings,
    counters: &mut DeliveryCounters,
) -> Dispatch
where
    R: Radio + ?Sized,
{
    let payload = match decode_token(&record.token, settings.payload_len) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("[POLL] Not sending token from {}: {}", record.created_at_ms, e);
            return Dispatch::DecodeFailed;
        }
    };

    info!("[POLL] New request from {}, sending token", record.created_at_ms);
    transmit(
        radio,
        payload.into_bytes(),
        settings.destination,
        settings.send_timeout,
        counters,
    )
    .await
}

/// Send one payload and classify the acknowledgment
pub async fn transmit<R>(
    radio: &mut R,
    payload: Bytes,
    destination: Address16,
    send_timeout: Duration,
    counters: &mut DeliveryCounters,
) -> Dispatch
where
    R: Radio + ?Sized,
{
    let frame_id = radio.next_frame_id();
    let request = TxRequest16::new(frame_id, destination, payload);
    info!(
        "[RADIO] Sending TX request frame_id={} to {} ({} bytes)",
        frame_id,
        destination,
        request.payload.len()
    );

    let started = Instant::now();
    let response = match radio.send_synchronous(&request, send_timeout).await {
        Ok(response) => response,
        Err(RadioError::Timeout(waited)) => {
            warn!("[RADIO] No TX status for frame_id={} within {:?}", frame_id, waited);
            return Dispatch::TimedOut;
        }
        Err(e) => {
            error!("[RADIO] Send failed: {}", e);
            return Dispatch::RadioFailed;
        }
    };

    match classify(&response, frame_id, counters) {
        Ok(TxOutcome::Success) => {
            info!(
                "[RADIO] Success in {}ms. {}",
                started.elapsed().as_millis(),
                counters
            );
            Dispatch::Sent(TxOutcome::Success)
        }
        Ok(TxOutcome::Failure { reason }) => {
            warn!("[RADIO] TX status failure: {:?}. {}", reason, counters);
            Dispatch::Sent(TxOutcome::Failure { reason })
        }
        Ok(TxOutcome::UnexpectedResponseType) => {
            debug!("[RADIO] Expected TX status but received {}", response);
            Dispatch::Sent(TxOutcome::UnexpectedResponseType)
        }
        Err(mismatch) => {
            error!("[RADIO] Stale acknowledgment: {}", mismatch);
            Dispatch::Mismatch(mismatch)
        }
    }
}

/// Repeat cycles with a fixed pause between them until `shutdown` resolves
///
/// A cycle in progress always completes; shutdown is only observed while
/// sleeping.
pub async fn run<S, R, F>(
    server: &S,
    radio: &mut R,
    settings: &CycleSettings,
    interval: Duration,
    state: &mut PollState,
    shutdown: F,
) where
    S: TokenServer + ?Sized,
    R: Radio + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        run_cycle(server, radio, settings, state).await;

        tokio::select! {
            _ = &mut shutdown => {
                info!("[POLL] Shutdown requested. {}", state.counters);
                break;
            }
            _ = sleep(interval) => {}
        }
    }
}
