use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::{JobId, JobState, time_serde};

/// Ephemeral record of a job, visible on the status surface while it waits or runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    /// When the slot was granted; the enqueue time while still `Queued`.
    #[serde(with = "time_serde")]
    pub admitted_at: SystemTime,
    /// When the body started executing under the watchdog.
    #[serde(with = "time_serde::option", default)]
    pub started_at: Option<SystemTime>,
    /// Soft deadline; `None` until the body starts.
    #[serde(with = "time_serde::option", default)]
    pub deadline: Option<SystemTime>,
    /// Time spent in the wait queue before admission (0 on the fast path).
    pub waited_ms: u64,
    /// Set once the soft deadline has passed while the body is still running.
    pub overdue: bool,
}

impl JobRecord {
    /// Record for a job that has just been granted a slot.
    pub fn admitted(id: JobId, waited: Duration) -> Self {
        Self {
            id,
            state: JobState::Running,
            admitted_at: SystemTime::now(),
            started_at: None,
            deadline: None,
            waited_ms: waited.as_millis() as u64,
            overdue: false,
        }
    }

    /// Record for a caller waiting in the queue.
    pub fn queued(id: JobId) -> Self {
        Self {
            state: JobState::Queued,
            ..Self::admitted(id, Duration::ZERO)
        }
    }

    /// Move a queued record to `Running` once its ticket is served.
    pub fn admit(&mut self, waited: Duration) {
        self.transition(JobState::Running);
        self.admitted_at = SystemTime::now();
        self.waited_ms = waited.as_millis() as u64;
    }

    /// Stamp the start of body execution and its soft deadline.
    ///
    /// A deadline too far out to represent is left unset.
    pub fn start(&mut self, soft_deadline: Duration) {
        let now = SystemTime::now();
        self.started_at = Some(now);
        self.deadline = now.checked_add(soft_deadline);
    }

    /// The soft deadline passed while the body is still running.
    pub fn mark_overdue(&mut self) {
        self.transition(JobState::TimedOut);
        self.overdue = true;
    }

    fn transition(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal job transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Seconds the body has been running, 0 if not started.
    pub fn running_for(&self) -> Duration {
        self.started_at
            .and_then(|t| t.elapsed().ok())
            .unwrap_or_default()
    }
}
