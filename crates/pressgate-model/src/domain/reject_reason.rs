use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a job never reached `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    /// No free slot and fail-fast mode (acquire timeout of zero).
    CapacityExceeded,
    /// No free slot and the waiting room is full.
    QueueFull,
    /// Waited the whole acquire timeout without being served.
    AcquireTimeout,
    /// Caller gave up (disconnected) while waiting.
    Cancelled,
}

impl RejectReason {
    pub const ALL: [RejectReason; 4] = [
        RejectReason::CapacityExceeded,
        RejectReason::QueueFull,
        RejectReason::AcquireTimeout,
        RejectReason::Cancelled,
    ];

    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::CapacityExceeded => "capacity_exceeded",
            RejectReason::QueueFull => "queue_full",
            RejectReason::AcquireTimeout => "acquire_timeout",
            RejectReason::Cancelled => "cancelled",
        }
    }

    /// Whether the end user should see a transient-overload signal.
    ///
    /// A cancelled caller is already gone, so nothing is surfaced for it.
    pub fn is_overload(&self) -> bool {
        !matches!(self, RejectReason::Cancelled)
    }
}

#[derive(Debug, Error)]
#[error("unknown reject reason: {0}")]
pub struct UnknownRejectReason(String);

impl FromStr for RejectReason {
    type Err = UnknownRejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RejectReason::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRejectReason(s.to_string()))
    }
}

/// Rejection totals split by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionBreakdown {
    pub capacity_exceeded: u64,
    pub queue_full: u64,
    pub acquire_timeout: u64,
    pub cancelled: u64,
}

impl RejectionBreakdown {
    pub fn record(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::CapacityExceeded => self.capacity_exceeded += 1,
            RejectReason::QueueFull => self.queue_full += 1,
            RejectReason::AcquireTimeout => self.acquire_timeout += 1,
            RejectReason::Cancelled => self.cancelled += 1,
        }
    }

    pub fn get(&self, reason: RejectReason) -> u64 {
        match reason {
            RejectReason::CapacityExceeded => self.capacity_exceeded,
            RejectReason::QueueFull => self.queue_full,
            RejectReason::AcquireTimeout => self.acquire_timeout,
            RejectReason::Cancelled => self.cancelled,
        }
    }

    pub fn total(&self) -> u64 {
        self.capacity_exceeded + self.queue_full + self.acquire_timeout + self.cancelled
    }
}
