//! Transmission outcome classification
//!
//! Interprets the response to a synchronous radio send and keeps the running
//! delivery tallies used for diagnostics.

use std::fmt;
use thiserror::Error;

use crate::api::RadioResponse;

/// Failure flags carried by a TX status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub ack_error: bool,
    pub cca_error: bool,
    pub purged: bool,
}

/// Why a transmission was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    AckError,
    CcaError,
    Purged,
    Unknown,
}

impl FailureReason {
    /// Pick the reason from the flags, ack error first, then CCA, then purge
    pub fn from_flags(flags: StatusFlags) -> Self {
        if flags.ack_error {
            FailureReason::AckError
        } else if flags.cca_error {
            FailureReason::CcaError
        } else if flags.purged {
            FailureReason::Purged
        } else {
            FailureReason::Unknown
        }
    }
}

/// Result of one classified transmission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Success,
    Failure { reason: FailureReason },
    /// Something other than a TX status answered the request
    UnexpectedResponseType,
}

/// The acknowledgment answered a different request
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("frame id does not match: sent {expected}, acknowledged {actual}")]
pub struct CorrelationMismatch {
    pub expected: u8,
    pub actual: u8,
}

/// Running delivery tallies, reset only on restart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryCounters {
    pub attempts: u64,
    pub errors: u64,
    pub ack_errors: u64,
    pub cca_errors: u64,
    pub purge_errors: u64,
    pub mismatches: u64,
}

impl DeliveryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_failure(&mut self, reason: FailureReason) {
        self.errors += 1;
        match reason {
            FailureReason::AckError => self.ack_errors += 1,
            FailureReason::CcaError => self.cca_errors += 1,
            FailureReason::Purged => self.purge_errors += 1,
            FailureReason::Unknown => {}
        }
    }
}

impl fmt::Display for DeliveryCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempts={} errors={} ack_errors={} cca_errors={} purge_errors={} mismatches={}",
            self.attempts,
            self.errors,
            self.ack_errors,
            self.cca_errors,
            self.purge_errors,
            self.mismatches
        )
    }
}

/// Classify the response to a transmit request carrying `expected_frame_id`
///
/// Every call counts as an attempt. Failures also bump `errors` and the
/// counter for their reason; a mismatched frame id is returned as an error
/// and counted in `mismatches`.
pub fn classify(
    response: &RadioResponse,
    expected_frame_id: u8,
    counters: &mut DeliveryCounters,
) -> Result<TxOutcome, CorrelationMismatch> {
    counters.attempts += 1;

    let status = match response {
        RadioResponse::TxStatus(status) => status,
        _ => return Ok(TxOutcome::UnexpectedResponseType),
    };

    if status.frame_id != expected_frame_id {
        counters.mismatches += 1;
        return Err(CorrelationMismatch {
            expected: expected_frame_id,
            actual: status.frame_id,
        });
    }

    if status.is_success() {
        return Ok(TxOutcome::Success);
    }

    let reason = FailureReason::from_flags(status.flags());
    counters.record_failure(reason);
    Ok(TxOutcome::Failure { reason })
}
