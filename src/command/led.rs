//! Diagnostic LED toggle
//!
//! Sends a single byte to the remote device instead of a token: 0xFF lights
//! the LED, 0x00 clears it. Useful for checking the radio path end to end.

use bytes::Bytes;
use clap::ValueEnum;
use std::fmt;
use std::time::Duration;
use tokenrelay_shared::{radio, Address16, DeliveryCounters};
use tracing::info;

use crate::poll::{transmit, Dispatch};
use crate::radio::Radio;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedState {
    On,
    Off,
}

impl LedState {
    pub fn payload_byte(self) -> u8 {
        match self {
            LedState::On => radio::LED_ON,
            LedState::Off => radio::LED_OFF,
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedState::On => write!(f, "on"),
            LedState::Off => write!(f, "off"),
        }
    }
}

/// Send one LED command and report how it was acknowledged
pub async fn run_led<R>(
    radio: &mut R,
    state: LedState,
    destination: Address16,
    send_timeout: Duration,
) -> Dispatch
where
    R: Radio + ?Sized,
{
    info!("[RADIO] Turning LED {} on {}", state, destination);

    let mut counters = DeliveryCounters::new();
    let payload = Bytes::copy_from_slice(&[state.payload_byte()]);
    transmit(radio, payload, destination, send_timeout, &mut counters).await
}
