//! Serial port setup for the local XBee

use anyhow::{anyhow, Result};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

use super::RadioLink;

/// Open the XBee serial port (8N1, no flow control)
pub fn open(port: &str, baud_rate: u32) -> Result<RadioLink<SerialStream>> {
    info!("[RADIO] Opening {} at {} baud", port, baud_rate);

    let stream = tokio_serial::new(port, baud_rate)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| anyhow!("Failed to open serial port {}: {}", port, e))?;

    Ok(RadioLink::new(stream))
}
