use serde::{Deserialize, Serialize};

/// Lifecycle of a job inside the admission layer.
///
/// ```text
/// Queued ──► Running ──► Completed
///    │          └──────► TimedOut
///    └─────────────────► Rejected
/// ```
///
/// A fast-path admission skips `Queued` and starts directly in `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    /// Waiting in the queue for an execution slot.
    Queued,
    /// Holding an execution slot.
    Running,
    /// Body finished (successfully or not) within the soft deadline.
    Completed,
    /// Soft deadline passed; the body still runs to completion and keeps its slot.
    TimedOut,
    /// Never got a slot: capacity, queue full, acquire timeout or cancellation.
    Rejected,
}

impl JobState {
    /// Returns `true` for states a job never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::TimedOut | JobState::Rejected
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Running)
                | (JobState::Queued, JobState::Rejected)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::TimedOut)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::TimedOut => "timedOut",
            JobState::Rejected => "rejected",
        }
    }
}
