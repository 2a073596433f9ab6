use serde::{Deserialize, Serialize};

/// Configured capacity of one process instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityLimits {
    /// Execution slots (N).
    pub max_concurrent_jobs: usize,
    /// Wait-queue capacity (M).
    pub max_job_queue: usize,
    /// 0 means fail-fast.
    pub acquire_timeout_secs: u64,
    /// Soft execution deadline.
    pub job_timeout_secs: u64,
    /// 0 disables the memory watchdog exit.
    pub max_rss_mb: u64,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            max_job_queue: 10,
            acquire_timeout_secs: 0,
            job_timeout_secs: 300,
            max_rss_mb: 0,
        }
    }
}

impl CapacityLimits {
    #[inline]
    pub fn is_fail_fast(&self) -> bool {
        self.acquire_timeout_secs == 0
    }

    #[inline]
    pub fn memory_watchdog_enabled(&self) -> bool {
        self.max_rss_mb > 0
    }
}
