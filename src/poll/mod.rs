//! Poll-and-dispatch loop
//!
//! Each cycle relays inbound telemetry, polls the token server, sends a fresh
//! token over the air and advances the watermark. Cycles never overlap.

mod cycle;
mod relay;
#[cfg(test)]
pub(crate) mod testing;

pub use cycle::{run, transmit, CycleSettings, Dispatch, PollState};
