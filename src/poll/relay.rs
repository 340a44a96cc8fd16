//! Telemetry relay: forward packets heard from the remote device to the server

use std::time::Duration;
use tokenrelay_shared::RadioResponse;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::radio::{Radio, RadioError};
use crate::server::TokenServer;

/// Tallies of inbound radio traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCounters {
    /// Frames read from the radio, including bad ones
    pub received: u64,
    /// RX packets accepted by the server
    pub relayed: u64,
    pub errors: u64,
}

/// Drain inbound frames for up to `window`, posting every RX16 packet
///
/// Returns the number of packets relayed. Failures are logged and counted;
/// they never abort the cycle.
pub async fn relay_received<S, R>(
    server: &S,
    radio: &mut R,
    window: Duration,
    counters: &mut RelayCounters,
) -> usize
where
    S: TokenServer + ?Sized,
    R: Radio + ?Sized,
{
    let deadline = Instant::now() + window;
    let mut relayed = 0;

    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        let response = match radio.next_response(wait).await {
            Ok(Some(response)) => response,
            Ok(None) => break,
            Err(RadioError::Codec(e)) => {
                counters.received += 1;
                counters.errors += 1;
                warn!("[RELAY] Response contains errors: {}", e);
                continue;
            }
            Err(e) => {
                counters.errors += 1;
                error!("[RELAY] Radio read failed: {}", e);
                break;
            }
        };
        counters.received += 1;

        match response {
            RadioResponse::Rx16(packet) => {
                info!("[RELAY] Received {}", packet);
                debug!("[RELAY] Payload bytes {:02X?}", &packet.data[..]);

                match server.submit_rx(&packet.to_string()).await {
                    Ok(()) => {
                        counters.relayed += 1;
                        relayed += 1;
                    }
                    Err(e) => {
                        counters.errors += 1;
                        warn!("[RELAY] Failed to relay packet: {}", e);
                    }
                }
            }
            other => {
                info!("[RELAY] Ignoring packet {}", other);
            }
        }
    }

    relayed
}
