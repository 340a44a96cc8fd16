//! XBee 802.15.4 API frames
//!
//! Outbound requests are built here and inbound frame data is decoded once
//! into the closed [`RadioResponse`] enum, so callers match on variants
//! instead of inspecting API identifiers.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::codec::CodecError;
use crate::outcome::StatusFlags;

/// API identifiers understood by the base station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApiId {
    TxRequest16 = 0x01,
    Rx64 = 0x80,
    Rx16 = 0x81,
    AtCommandResponse = 0x88,
    TxStatus = 0x89,
    ModemStatus = 0x8A,
}

impl TryFrom<u8> for ApiId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ApiId::TxRequest16),
            0x80 => Ok(ApiId::Rx64),
            0x81 => Ok(ApiId::Rx16),
            0x88 => Ok(ApiId::AtCommandResponse),
            0x89 => Ok(ApiId::TxStatus),
            0x8A => Ok(ApiId::ModemStatus),
            other => Err(other),
        }
    }
}

/// 16-bit network address (the remote module's MY parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address16(pub u16);

impl Address16 {
    /// Every module on the PAN
    pub const BROADCAST: Address16 = Address16(0xFFFF);
}

impl fmt::Display for Address16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Transmit request to a 16-bit address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest16 {
    /// Correlation id echoed in the TX status; 0 suppresses the status
    pub frame_id: u8,
    pub destination: Address16,
    pub options: u8,
    pub payload: Bytes,
}

impl TxRequest16 {
    pub fn new(frame_id: u8, destination: Address16, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_id,
            destination,
            options: 0,
            payload: payload.into(),
        }
    }

    /// Frame data as handed to [`crate::codec::encode`]
    pub fn to_frame_data(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5 + self.payload.len());
        buf.put_u8(ApiId::TxRequest16 as u8);
        buf.put_u8(self.frame_id);
        buf.put_u16(self.destination.0);
        buf.put_u8(self.options);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Delivery status reported in a TX status frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatusCode {
    Success,
    /// No MAC acknowledgment from the destination
    NoAck,
    /// Clear channel assessment failed
    CcaFailure,
    /// Dropped from the transmit queue
    Purged,
    Other(u8),
}

impl From<u8> for TxStatusCode {
    fn from(value: u8) -> Self {
        match value {
            0 => TxStatusCode::Success,
            1 => TxStatusCode::NoAck,
            2 => TxStatusCode::CcaFailure,
            3 => TxStatusCode::Purged,
            other => TxStatusCode::Other(other),
        }
    }
}

/// Acknowledgment of a transmit request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxStatus {
    pub frame_id: u8,
    pub status: TxStatusCode,
}

impl TxStatus {
    pub fn is_success(&self) -> bool {
        self.status == TxStatusCode::Success
    }

    /// Failure flags for classification
    pub fn flags(&self) -> StatusFlags {
        StatusFlags {
            ack_error: self.status == TxStatusCode::NoAck,
            cca_error: self.status == TxStatusCode::CcaFailure,
            purged: self.status == TxStatusCode::Purged,
        }
    }
}

/// RF data received from a 16-bit addressed module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxPacket16 {
    pub source: Address16,
    /// Signal strength as -dBm
    pub rssi: u8,
    pub options: u8,
    pub data: Bytes,
}

impl fmt::Display for RxPacket16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RX16 source={} rssi=-{}dBm options=0x{:02X} data={}",
            self.source,
            self.rssi,
            self.options,
            hex::encode_upper(&self.data)
        )
    }
}

/// RF data received from a 64-bit addressed module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxPacket64 {
    pub source: u64,
    pub rssi: u8,
    pub options: u8,
    pub data: Bytes,
}

impl fmt::Display for RxPacket64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RX64 source=0x{:016X} rssi=-{}dBm options=0x{:02X} data={}",
            self.source,
            self.rssi,
            self.options,
            hex::encode_upper(&self.data)
        )
    }
}

/// Local AT command response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCommandResponse {
    pub frame_id: u8,
    pub command: [u8; 2],
    pub status: u8,
    pub value: Bytes,
}

/// Inbound frame, decoded once at the transport boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioResponse {
    TxStatus(TxStatus),
    Rx16(RxPacket16),
    Rx64(RxPacket64),
    AtCommand(AtCommandResponse),
    ModemStatus(u8),
    /// Any other API identifier (IO samples, remote AT, ...)
    Unknown { api_id: u8, data: Bytes },
}

fn malformed(api_id: ApiId, reason: &str) -> CodecError {
    CodecError::Malformed {
        api_id: api_id as u8,
        reason: reason.into(),
    }
}

impl RadioResponse {
    /// Parse unescaped frame data (API identifier first)
    pub fn parse(frame: &[u8]) -> Result<Self, CodecError> {
        let (&api_id, body) = frame.split_first().ok_or(CodecError::EmptyFrame)?;

        let api = match ApiId::try_from(api_id) {
            Ok(api) => api,
            Err(api_id) => {
                return Ok(RadioResponse::Unknown {
                    api_id,
                    data: Bytes::copy_from_slice(body),
                })
            }
        };

        match api {
            ApiId::TxStatus => {
                if body.len() < 2 {
                    return Err(malformed(api, "TX status needs frame id and status"));
                }
                Ok(RadioResponse::TxStatus(TxStatus {
                    frame_id: body[0],
                    status: TxStatusCode::from(body[1]),
                }))
            }
            ApiId::Rx16 => {
                if body.len() < 4 {
                    return Err(malformed(api, "RX16 header is 4 bytes"));
                }
                Ok(RadioResponse::Rx16(RxPacket16 {
                    source: Address16(u16::from_be_bytes([body[0], body[1]])),
                    rssi: body[2],
                    options: body[3],
                    data: Bytes::copy_from_slice(&body[4..]),
                }))
            }
            ApiId::Rx64 => {
                if body.len() < 10 {
                    return Err(malformed(api, "RX64 header is 10 bytes"));
                }
                let mut source = [0u8; 8];
                source.copy_from_slice(&body[..8]);
                Ok(RadioResponse::Rx64(RxPacket64 {
                    source: u64::from_be_bytes(source),
                    rssi: body[8],
                    options: body[9],
                    data: Bytes::copy_from_slice(&body[10..]),
                }))
            }
            ApiId::AtCommandResponse => {
                if body.len() < 4 {
                    return Err(malformed(api, "AT response header is 4 bytes"));
                }
                Ok(RadioResponse::AtCommand(AtCommandResponse {
                    frame_id: body[0],
                    command: [body[1], body[2]],
                    status: body[3],
                    value: Bytes::copy_from_slice(&body[4..]),
                }))
            }
            ApiId::ModemStatus => match body.first() {
                Some(status) => Ok(RadioResponse::ModemStatus(*status)),
                None => Err(malformed(api, "modem status needs a status byte")),
            },
            ApiId::TxRequest16 => Err(malformed(api, "TX request is outbound only")),
        }
    }

    /// Correlation id, for frames that answer a request
    pub fn frame_id(&self) -> Option<u8> {
        match self {
            RadioResponse::TxStatus(status) => Some(status.frame_id),
            RadioResponse::AtCommand(at) => Some(at.frame_id),
            _ => None,
        }
    }
}

impl fmt::Display for RadioResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioResponse::TxStatus(status) => write!(
                f,
                "TX status frame_id={} status={:?}",
                status.frame_id, status.status
            ),
            RadioResponse::Rx16(packet) => write!(f, "{}", packet),
            RadioResponse::Rx64(packet) => write!(f, "{}", packet),
            RadioResponse::AtCommand(at) => write!(
                f,
                "AT response frame_id={} command={}{} status={}",
                at.frame_id, at.command[0] as char, at.command[1] as char, at.status
            ),
            RadioResponse::ModemStatus(status) => write!(f, "modem status {}", status),
            RadioResponse::Unknown { api_id, data } => write!(
                f,
                "frame api_id=0x{:02X} data={}",
                api_id,
                hex::encode_upper(data)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_request_frame_data() {
        let tx = TxRequest16::new(1, Address16(0x5001), &b"Hello"[..]);
        assert_eq!(
            &tx.to_frame_data()[..],
            &[0x01, 0x01, 0x50, 0x01, 0x00, 0x48, 0x65, 0x6C, 0x6C, 0x6F]
        );
    }

    #[test]
    fn test_parse_tx_status() {
        let response = RadioResponse::parse(&[0x89, 0x05, 0x02]).expect("parse failed");
        assert_eq!(
            response,
            RadioResponse::TxStatus(TxStatus {
                frame_id: 5,
                status: TxStatusCode::CcaFailure,
            })
        );
        assert_eq!(response.frame_id(), Some(5));
    }

    #[test]
    fn test_parse_rx16() {
        let response =
            RadioResponse::parse(&[0x81, 0x12, 0x34, 0x28, 0x00, 0xDE, 0xAD]).expect("parse failed");
        let RadioResponse::Rx16(packet) = response else {
            panic!("expected RX16");
        };
        assert_eq!(packet.source, Address16(0x1234));
        assert_eq!(packet.rssi, 0x28);
        assert_eq!(&packet.data[..], &[0xDE, 0xAD]);
        assert_eq!(
            packet.to_string(),
            "RX16 source=0x1234 rssi=-40dBm options=0x00 data=DEAD"
        );
    }

    #[test]
    fn test_parse_rx64_and_modem_status() {
        let mut frame = vec![0x80];
        frame.extend_from_slice(&0x0013_A200_4000_0001u64.to_be_bytes());
        frame.extend_from_slice(&[0x30, 0x02, 0x01]);
        let RadioResponse::Rx64(packet) = RadioResponse::parse(&frame).expect("parse failed")
        else {
            panic!("expected RX64");
        };
        assert_eq!(packet.source, 0x0013_A200_4000_0001);
        assert_eq!(&packet.data[..], &[0x01]);

        assert_eq!(
            RadioResponse::parse(&[0x8A, 0x00]).expect("parse failed"),
            RadioResponse::ModemStatus(0)
        );
    }

    #[test]
    fn test_unknown_api_id_is_preserved() {
        let response = RadioResponse::parse(&[0x83, 0x01, 0x02]).expect("parse failed");
        assert!(matches!(response, RadioResponse::Unknown { api_id: 0x83, .. }));
        assert_eq!(response.frame_id(), None);
    }

    #[test]
    fn test_short_frames_are_malformed() {
        assert!(matches!(
            RadioResponse::parse(&[0x89, 0x01]),
            Err(CodecError::Malformed { api_id: 0x89, .. })
        ));
        assert!(matches!(
            RadioResponse::parse(&[0x81, 0x00]),
            Err(CodecError::Malformed { api_id: 0x81, .. })
        ));
        assert_eq!(RadioResponse::parse(&[]), Err(CodecError::EmptyFrame));
    }

    #[test]
    fn test_status_flags() {
        let status = TxStatus {
            frame_id: 1,
            status: TxStatusCode::from(1),
        };
        assert!(!status.is_success());
        assert!(status.flags().ack_error);
        assert!(!status.flags().cca_error);
        assert_eq!(TxStatusCode::from(9), TxStatusCode::Other(9));
    }
}
