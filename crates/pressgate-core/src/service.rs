use std::sync::Arc;

use pressgate_model::StatusSnapshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    admission::AdmissionController,
    config::ServiceConfig,
    error::{AuthError, CoreError},
    metrics::MetricsBackend,
    observer::{Observer, ObserverSet},
    status::{AdminAuth, StatusReporter},
    watchdog::{ExecutionWatchdog, JobRunner, MemoryStats, MemoryWatchdog},
};

/// The admission layer assembled from a [`ServiceConfig`].
///
/// Cheap to clone; every clone shares the same slots, queue and counters.
#[derive(Clone)]
pub struct GateService {
    config: Arc<ServiceConfig>,
    observers: ObserverSet,
    runner: JobRunner,
    reporter: StatusReporter,
    auth: AdminAuth,
    memory: MemoryStats,
    metrics: Option<Arc<dyn MetricsBackend>>,
    shutdown: CancellationToken,
}

impl GateService {
    #[instrument(
        level = "info",
        skip_all,
        fields(slots = config.max_concurrent_jobs, queue = config.max_job_queue)
    )]
    pub fn new(
        config: ServiceConfig,
        observers: Vec<Arc<dyn Observer>>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let observers = ObserverSet::new(observers);
        let controller = AdmissionController::new(
            config.max_concurrent_jobs,
            config.max_job_queue,
            observers.clone(),
        );
        let runner = JobRunner::new(
            controller.clone(),
            ExecutionWatchdog::new(config.soft_deadline()),
            config.job_acquire_timeout,
        );
        let memory = MemoryStats::new(config.max_rss_mb);
        let reporter = StatusReporter::new(
            config.service_name.clone(),
            env!("CARGO_PKG_VERSION"),
            config.limits(),
            controller,
            memory.clone(),
        );
        let auth = AdminAuth::new(config.admin_key.clone());

        info!(
            acquire_timeout_s = config.job_acquire_timeout.as_secs(),
            job_timeout_s = config.job_timeout.as_secs(),
            max_rss_mb = config.max_rss_mb,
            admin = auth.is_enabled(),
            "admission layer ready"
        );

        Ok(Self {
            config: Arc::new(config),
            observers,
            runner,
            reporter,
            auth,
            memory,
            metrics: None,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    pub fn controller(&self) -> &AdmissionController {
        self.runner.controller()
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    pub fn auth(&self) -> &AdminAuth {
        &self.auth
    }

    pub fn metrics(&self) -> Option<&Arc<dyn MetricsBackend>> {
        self.metrics.as_ref()
    }

    /// Fires on [`GateService::shutdown`]; waiting callers give up their tickets.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.reporter.snapshot()
    }

    /// Status for an admin caller presenting `key`.
    pub fn authorized_snapshot(&self, key: Option<&str>) -> Result<StatusSnapshot, AuthError> {
        self.auth.authorize(key)?;
        Ok(self.reporter.snapshot())
    }

    /// Spawn the memory watchdog on the current runtime. It stops on shutdown.
    pub fn start_memory_watchdog(&self) -> JoinHandle<()> {
        self.memory_watchdog().spawn(self.shutdown.child_token())
    }

    /// A watchdog feeding this service's memory readings, not yet started.
    pub fn memory_watchdog(&self) -> MemoryWatchdog {
        MemoryWatchdog::with_stats(
            self.memory.clone(),
            self.config.memory_sample_interval,
            self.observers.clone(),
        )
    }

    pub fn shutdown(&self) {
        info!("admission layer shutting down");
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use std::time::Duration;

    #[test]
    fn rejects_invalid_config() {
        let cfg = ServiceConfig {
            memory_sample_interval: Duration::ZERO,
            ..Default::default()
        };
        let err = GateService::new(cfg, Vec::new()).err().unwrap();
        assert!(matches!(err, CoreError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn wires_limits_and_auth_from_config() {
        let cfg = ServiceConfig {
            max_concurrent_jobs: 3,
            max_job_queue: 7,
            job_acquire_timeout: Duration::from_secs(2),
            admin_key: Some("k".into()),
            ..Default::default()
        };
        let svc = GateService::new(cfg, Vec::new()).unwrap();

        assert_eq!(svc.controller().slots(), 3);
        assert_eq!(svc.controller().queue_capacity(), 7);
        assert_eq!(svc.runner().acquire_timeout(), Duration::from_secs(2));
        assert!(svc.auth().is_enabled());
        assert!(svc.metrics().is_none());
    }

    #[tokio::test]
    async fn extreme_limits_from_config_do_not_panic() {
        let cfg = ServiceConfig::from_lookup(|key| match key {
            "MAX_JOB_QUEUE" | "JOB_TIMEOUT_SECONDS" => Some(u64::MAX.to_string()),
            _ => None,
        })
        .unwrap();
        let svc = GateService::new(cfg, Vec::new()).unwrap();
        assert_eq!(svc.controller().queue_capacity(), u64::MAX as usize);

        let report = svc
            .runner()
            .run(|| Ok::<_, String>(1), &svc.shutdown_token())
            .await
            .unwrap();
        assert_eq!(report.result, Ok(1));
    }

    #[test]
    fn admin_snapshot_requires_key() {
        let cfg = ServiceConfig {
            admin_key: Some("k".into()),
            ..Default::default()
        };
        let svc = GateService::new(cfg, Vec::new()).unwrap();

        assert_eq!(svc.authorized_snapshot(Some("x")).err(), Some(AuthError::Unauthorized));
        let snap = svc.authorized_snapshot(Some("k")).unwrap();
        assert_eq!(snap.service, crate::config::DEFAULT_SERVICE_NAME);
        assert_eq!(snap.limits.max_job_queue, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_memory_watchdog() {
        let svc = GateService::new(ServiceConfig::default(), Vec::new()).unwrap();
        let handle = svc.start_memory_watchdog();

        tokio::time::sleep(Duration::from_secs(11)).await;
        svc.shutdown();
        handle.await.unwrap();
    }
}
