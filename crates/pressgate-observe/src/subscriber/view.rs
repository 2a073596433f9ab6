use std::borrow::Borrow;

use pressgate_model::{Event, EventKind, bytes_to_mb};
use tracing::{debug, error, info, trace, warn};

/// Field accessors with log-friendly fallbacks.
pub trait View {
    fn kind(&self) -> EventKind;
    fn job(&self) -> String;
    fn reason(&self) -> &'static str;
    fn position(&self) -> usize;
    fn wait_ms(&self) -> u64;
    fn elapsed_ms(&self) -> u64;
    fn timeout_ms(&self) -> u64;
    fn rss_mb(&self) -> f64;
    fn threshold_mb(&self) -> u64;
    fn failed(&self) -> bool;
    fn timed_out(&self) -> bool;
}

impl<T> View for T
where
    T: Borrow<Event>,
{
    #[inline]
    fn kind(&self) -> EventKind {
        self.borrow().kind
    }
    fn job(&self) -> String {
        self.borrow()
            .job
            .map(|j| j.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
    #[inline]
    fn reason(&self) -> &'static str {
        self.borrow().reason.map(|r| r.as_str()).unwrap_or("unknown")
    }
    #[inline]
    fn position(&self) -> usize {
        self.borrow().position.unwrap_or(0)
    }
    #[inline]
    fn wait_ms(&self) -> u64 {
        self.borrow().wait_ms.unwrap_or(0)
    }
    #[inline]
    fn elapsed_ms(&self) -> u64 {
        self.borrow().elapsed_ms.unwrap_or(0)
    }
    #[inline]
    fn timeout_ms(&self) -> u64 {
        self.borrow().timeout_ms.unwrap_or(0)
    }
    #[inline]
    fn rss_mb(&self) -> f64 {
        self.borrow().rss.map(bytes_to_mb).unwrap_or(0.0)
    }
    #[inline]
    fn threshold_mb(&self) -> u64 {
        self.borrow().threshold_mb.unwrap_or(0)
    }
    #[inline]
    fn failed(&self) -> bool {
        self.borrow().failed
    }
    #[inline]
    fn timed_out(&self) -> bool {
        self.borrow().timed_out
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // admission
        EventKind::JobQueued => "job queued, waiting for an execution slot",
        EventKind::JobAdmitted => "job admitted",
        EventKind::JobRejected => "job rejected",
        EventKind::SlotReleased => "execution slot released",

        // execution
        EventKind::JobStarted => "job body started",
        EventKind::SoftDeadlineExceeded => "job exceeded soft deadline (still running)",
        EventKind::JobCompleted => "job body finished",

        // memory
        EventKind::MemorySampled => "memory sampled",
        EventKind::MemoryThresholdBreached => "rss above ceiling, process will exit",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // admission
        EventKind::JobQueued => debug!(job = %e.job(), position = e.position(), "{msg}"),
        EventKind::JobAdmitted => debug!(job = %e.job(), wait_ms = e.wait_ms(), "{msg}"),
        EventKind::JobRejected => {
            warn!(job = %e.job(), reason = e.reason(), wait_ms = e.wait_ms(), "{msg}")
        }
        EventKind::SlotReleased => trace!(job = %e.job(), "{msg}"),

        // execution
        EventKind::JobStarted => debug!(job = %e.job(), timeout_ms = e.timeout_ms(), "{msg}"),
        EventKind::SoftDeadlineExceeded => {
            warn!(job = %e.job(), timeout_ms = e.timeout_ms(), "{msg}")
        }
        EventKind::JobCompleted => {
            if e.failed() {
                warn!(
                    job = %e.job(),
                    elapsed_ms = e.elapsed_ms(),
                    timed_out = e.timed_out(),
                    "job body failed",
                );
            } else {
                info!(
                    job = %e.job(),
                    elapsed_ms = e.elapsed_ms(),
                    timed_out = e.timed_out(),
                    "{msg}",
                );
            }
        }

        // memory
        EventKind::MemorySampled => trace!(rss_mb = e.rss_mb(), "{msg}"),
        EventKind::MemoryThresholdBreached => error!(
            rss_mb = e.rss_mb(),
            threshold_mb = e.threshold_mb(),
            "{msg}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressgate_model::{JobId, RejectReason};
    use std::time::Duration;

    #[test]
    fn view_falls_back_on_missing_fields() {
        let e = Event::new(EventKind::JobRejected);
        assert_eq!(e.job(), "unknown");
        assert_eq!(e.reason(), "unknown");
        assert_eq!(View::wait_ms(&e), 0);
    }

    #[test]
    fn view_reads_populated_fields() {
        let id = JobId::new();
        let e = Event::new(EventKind::JobRejected)
            .with_job(id)
            .with_reason(RejectReason::QueueFull)
            .with_wait(Duration::from_millis(1500));
        assert_eq!(e.job(), id.to_string());
        assert_eq!(e.reason(), "queue_full");
        assert_eq!(View::wait_ms(&e), 1500);
    }

    #[test]
    fn every_kind_logs_without_subscriber() {
        for kind in [
            EventKind::JobQueued,
            EventKind::JobAdmitted,
            EventKind::JobRejected,
            EventKind::SlotReleased,
            EventKind::JobStarted,
            EventKind::SoftDeadlineExceeded,
            EventKind::JobCompleted,
            EventKind::MemorySampled,
            EventKind::MemoryThresholdBreached,
        ] {
            assert!(!message_for(kind).is_empty());
            log_event(Event::new(kind));
        }
    }
}
