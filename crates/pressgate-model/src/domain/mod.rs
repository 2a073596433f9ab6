mod job_id;
pub use job_id::JobId;

mod job_state;
pub use job_state::JobState;

mod job_record;
pub use job_record::JobRecord;

mod reject_reason;
pub use reject_reason::{RejectReason, RejectionBreakdown};

mod limits;
pub use limits::CapacityLimits;

mod status;
pub use status::{AdmissionCounters, MemorySnapshot, StatusSnapshot, SystemInfo};

mod event;
pub use event::{Event, EventKind};

pub mod time_serde;

/// Resident memory size in bytes.
pub type RssBytes = u64;

/// Convert a byte count into whole mebibytes, the unit operators configure thresholds in.
#[inline]
pub fn bytes_to_mb(bytes: RssBytes) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
