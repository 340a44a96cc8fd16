//! Authorization requests and the freshness watermark

use serde::Deserialize;

/// Pending authorization request as served by the token server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthRequestRecord {
    /// Server-assigned creation time (epoch millis)
    #[serde(rename = "time")]
    pub created_at_ms: u64,
    /// Hex token to relay
    pub token: String,
}

/// Time of the most recently processed poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    last_seen_ms: u64,
}

impl Watermark {
    pub fn new(last_seen_ms: u64) -> Self {
        Self { last_seen_ms }
    }

    /// Watermark at the current time; requests created before startup are ignored
    pub fn starting_now() -> Self {
        Self::new(crate::now_ms())
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    /// A record is fresh iff it was created strictly after the watermark
    pub fn is_fresh(&self, record: &AuthRequestRecord) -> bool {
        record.created_at_ms > self.last_seen_ms
    }

    /// Move forward to `now_ms`; never moves backwards
    pub fn advance_to(&mut self, now_ms: u64) {
        self.last_seen_ms = self.last_seen_ms.max(now_ms);
    }
}
