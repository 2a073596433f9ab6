use std::fmt;
use std::time::SystemTime;

use pressgate_model::{CapacityLimits, StatusSnapshot};
use subtle::ConstantTimeEq;

use crate::{admission::AdmissionController, error::AuthError, system, watchdog::MemoryStats};

/// Read-only view over admission and memory state.
#[derive(Clone)]
pub struct StatusReporter {
    service: String,
    version: String,
    limits: CapacityLimits,
    controller: AdmissionController,
    memory: MemoryStats,
    started_at: SystemTime,
}

impl StatusReporter {
    pub fn new(
        service: impl Into<String>,
        version: impl Into<String>,
        limits: CapacityLimits,
        controller: AdmissionController,
        memory: MemoryStats,
    ) -> Self {
        system::init_uptime();
        Self {
            service: service.into(),
            version: version.into(),
            limits,
            controller,
            memory,
            started_at: SystemTime::now(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Point-in-time status.
    ///
    /// Admission counters and the running-job table come from a single lock
    /// acquisition; memory readings are eventually consistent.
    pub fn snapshot(&self) -> StatusSnapshot {
        let (counters, jobs) = self.controller.snapshot();
        StatusSnapshot {
            service: self.service.clone(),
            version: self.version.clone(),
            started_at: self.started_at,
            uptime_seconds: system::uptime_seconds(),
            limits: self.limits,
            counters,
            memory: self.memory.snapshot(),
            system: system::system_info(),
            jobs,
        }
    }
}

/// Shared-secret gate for the admin surface.
#[derive(Clone, Default)]
pub struct AdminAuth {
    key: Option<String>,
}

impl AdminAuth {
    /// An empty key disables the admin surface, same as no key.
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let Some(expected) = self.key.as_deref() else {
            return Err(AuthError::Disabled);
        };
        let presented = presented.ok_or(AuthError::Unauthorized)?;
        let equal = expected.len() == presented.len()
            && bool::from(expected.as_bytes().ct_eq(presented.as_bytes()));
        if equal {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}

impl fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAuth")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ObserverSet;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn auth_without_key_hides_surface() {
        let auth = AdminAuth::new(None);
        assert_eq!(auth.authorize(Some("anything")), Err(AuthError::Disabled));
        assert_eq!(AdminAuth::new(Some(String::new())).authorize(None), Err(AuthError::Disabled));
    }

    #[test]
    fn auth_accepts_only_exact_key() {
        let auth = AdminAuth::new(Some("s3cret".into()));
        assert!(auth.authorize(Some("s3cret")).is_ok());
        assert_eq!(auth.authorize(Some("s3cre")), Err(AuthError::Unauthorized));
        assert_eq!(auth.authorize(Some("S3cret")), Err(AuthError::Unauthorized));
        assert_eq!(auth.authorize(None), Err(AuthError::Unauthorized));
    }

    #[test]
    fn auth_debug_never_prints_key() {
        let auth = AdminAuth::new(Some("hunter2".into()));
        assert!(!format!("{auth:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn snapshot_tracks_admission_counters() {
        let controller = AdmissionController::new(1, 1, ObserverSet::default());
        let memory = MemoryStats::new(500);
        memory.record(42 * 1024 * 1024);
        let limits = CapacityLimits {
            max_concurrent_jobs: 1,
            max_job_queue: 1,
            max_rss_mb: 500,
            ..Default::default()
        };
        let reporter = StatusReporter::new("svc", "1.2.3", limits, controller.clone(), memory);
        let cancel = CancellationToken::new();

        let permit = controller.admit(Duration::ZERO, &cancel).await.unwrap();
        let _ = controller.admit(Duration::ZERO, &cancel).await;

        let snap = reporter.snapshot();
        assert_eq!(snap.counters.active, 1);
        assert_eq!(snap.counters.total_admitted, 1);
        assert_eq!(snap.counters.total_rejected, 1);
        assert_eq!(snap.jobs.len(), 1);
        assert_eq!(snap.jobs[0].id, permit.job_id());
        assert_eq!(snap.memory.last_sampled_rss, 42 * 1024 * 1024);
        assert!(snap.memory.watchdog_enabled);
        assert_eq!(snap.limits.max_rss_mb, 500);
        assert_eq!(snap.system.pid, std::process::id());

        drop(permit);
        let snap = reporter.snapshot();
        assert_eq!(snap.counters.active, 0);
        assert!(snap.jobs.is_empty());
        assert_eq!(snap.counters.total_finished, 1);
    }
}
