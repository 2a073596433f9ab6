use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{CapacityLimits, JobRecord, RejectionBreakdown, RssBytes, time_serde};

/// Admission counters taken under the controller lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionCounters {
    pub active: usize,
    pub queued: usize,
    pub total_admitted: u64,
    pub total_rejected: u64,
    pub rejected: RejectionBreakdown,
    pub total_timed_out: u64,
    pub total_finished: u64,
    #[serde(with = "time_serde::option", default)]
    pub last_started_at: Option<SystemTime>,
    #[serde(with = "time_serde::option", default)]
    pub last_finished_at: Option<SystemTime>,
}

/// Memory watchdog readings. Eventually consistent with the sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub last_sampled_rss: RssBytes,
    pub peak_rss: RssBytes,
    pub samples: u64,
    pub watchdog_enabled: bool,
    pub threshold_mb: u64,
}

/// Facts about the hosting process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub pid: u32,
    pub host: String,
    pub platform: String,
    pub arch: String,
    pub load_avg: [f64; 3],
}

/// Point-in-time view for the operational dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub service: String,
    pub version: String,
    #[serde(with = "time_serde")]
    pub started_at: SystemTime,
    pub uptime_seconds: u64,
    pub limits: CapacityLimits,
    pub counters: AdmissionCounters,
    pub memory: MemorySnapshot,
    pub system: SystemInfo,
    /// Jobs currently holding a slot.
    pub jobs: Vec<JobRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_wire_shape_is_camel_case() {
        let snap = StatusSnapshot {
            service: "svc".into(),
            version: "1.0.0".into(),
            started_at: SystemTime::now(),
            uptime_seconds: 7,
            limits: CapacityLimits::default(),
            counters: AdmissionCounters {
                active: 1,
                total_admitted: 3,
                ..Default::default()
            },
            memory: MemorySnapshot::default(),
            system: SystemInfo {
                pid: 42,
                host: "box".into(),
                platform: "linux".into(),
                arch: "x86_64".into(),
                load_avg: [0.5, 0.25, 0.0],
            },
            jobs: vec![],
        };

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["uptimeSeconds"], 7);
        assert_eq!(json["limits"]["maxConcurrentJobs"], 1);
        assert_eq!(json["limits"]["maxJobQueue"], 10);
        assert_eq!(json["counters"]["totalAdmitted"], 3);
        assert_eq!(json["counters"]["rejected"]["queueFull"], 0);
        assert!(json["counters"]["lastStartedAt"].is_null());
        assert_eq!(json["system"]["loadAvg"][0], 0.5);
    }
}
