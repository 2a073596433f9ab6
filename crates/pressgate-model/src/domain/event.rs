//! # Admission and watchdog events.
//!
//! The core publishes an [`Event`] for every admission decision, job lifecycle step
//! and memory sample. Observers (log journal, metrics) consume them.
//!
//! Each event carries a process-wide sequence number (`seq`) so consumers can
//! restore ordering.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::{JobId, RejectReason, RssBytes};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Admission ===
    /// Caller took a ticket in the wait queue.
    ///
    /// Sets: `job`, `position`.
    JobQueued,
    /// Caller got a slot, either immediately or when served from the queue.
    ///
    /// Sets: `job`, `wait_ms` (0 on the fast path).
    JobAdmitted,
    /// Caller did not get a slot.
    ///
    /// Sets: `job`, `reason`, `wait_ms`.
    JobRejected,
    /// Slot returned; either back to the pool or handed to the queue head.
    ///
    /// Sets: `job`.
    SlotReleased,

    // === Execution ===
    /// Body started under the execution watchdog.
    ///
    /// Sets: `job`, `timeout_ms`.
    JobStarted,
    /// Soft deadline passed while the body is still running.
    ///
    /// Sets: `job`, `timeout_ms`.
    SoftDeadlineExceeded,
    /// Body returned (success or failure).
    ///
    /// Sets: `job`, `elapsed_ms`, `failed`, `timed_out`.
    JobCompleted,

    // === Memory ===
    /// Periodic RSS reading.
    ///
    /// Sets: `rss`.
    MemorySampled,
    /// RSS crossed the configured ceiling; the process is about to exit.
    ///
    /// Sets: `rss`, `threshold_mb`.
    MemoryThresholdBreached,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JobQueued => "job_queued",
            EventKind::JobAdmitted => "job_admitted",
            EventKind::JobRejected => "job_rejected",
            EventKind::SlotReleased => "slot_released",
            EventKind::JobStarted => "job_started",
            EventKind::SoftDeadlineExceeded => "soft_deadline_exceeded",
            EventKind::JobCompleted => "job_completed",
            EventKind::MemorySampled => "memory_sampled",
            EventKind::MemoryThresholdBreached => "memory_threshold_breached",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub seq: u64,
    pub at: SystemTime,
    pub kind: EventKind,
    pub job: Option<JobId>,
    pub reason: Option<RejectReason>,
    pub position: Option<usize>,
    pub wait_ms: Option<u64>,
    pub elapsed_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub rss: Option<RssBytes>,
    pub threshold_mb: Option<u64>,
    pub failed: bool,
    pub timed_out: bool,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            reason: None,
            position: None,
            wait_ms: None,
            elapsed_ms: None,
            timeout_ms: None,
            rss: None,
            threshold_mb: None,
            failed: false,
            timed_out: false,
        }
    }

    #[inline]
    pub fn with_job(mut self, job: JobId) -> Self {
        self.job = Some(job);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: RejectReason) -> Self {
        self.reason = Some(reason);
        self
    }

    #[inline]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    #[inline]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait_ms = Some(wait.as_millis() as u64);
        self
    }

    #[inline]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(elapsed.as_millis() as u64);
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    #[inline]
    pub fn with_rss(mut self, rss: RssBytes) -> Self {
        self.rss = Some(rss);
        self
    }

    #[inline]
    pub fn with_threshold_mb(mut self, mb: u64) -> Self {
        self.threshold_mb = Some(mb);
        self
    }

    #[inline]
    pub fn with_failed(mut self, failed: bool) -> Self {
        self.failed = failed;
        self
    }

    #[inline]
    pub fn with_timed_out(mut self, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::JobQueued);
        let b = Event::new(EventKind::JobAdmitted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builder_sets_fields() {
        let id = JobId::new();
        let ev = Event::new(EventKind::JobRejected)
            .with_job(id)
            .with_reason(RejectReason::QueueFull)
            .with_wait(Duration::from_millis(12));

        assert_eq!(ev.kind, EventKind::JobRejected);
        assert_eq!(ev.job, Some(id));
        assert_eq!(ev.reason, Some(RejectReason::QueueFull));
        assert_eq!(ev.wait_ms, Some(12));
        assert!(ev.rss.is_none());
    }
}
