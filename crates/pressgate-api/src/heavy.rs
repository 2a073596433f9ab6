use pressgate_core::{GateService, JobBody};
use tracing::debug;

use crate::error::ApiError;

/// Run a CPU-heavy job body under admission control.
///
/// Rejections become [`ApiError::Rejected`] (503), body failures
/// [`ApiError::Job`]. If the calling request is dropped while waiting, its
/// ticket is withdrawn; once admitted, the body finishes regardless.
pub async fn run_heavy<B>(service: &GateService, body: B) -> Result<B::Output, ApiError>
where
    B: JobBody,
{
    let cancel = service.shutdown_token();
    let report = service.runner().run(body, &cancel).await?;
    debug!(
        job = %report.id,
        waited_ms = report.waited.as_millis() as u64,
        elapsed_ms = report.elapsed.as_millis() as u64,
        timed_out = report.timed_out(),
        "heavy job done"
    );
    Ok(report.result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressgate_core::{AdmitError, JobError, ServiceConfig};
    use std::time::Duration;

    fn service(slots: usize) -> GateService {
        let cfg = ServiceConfig {
            max_concurrent_jobs: slots,
            ..Default::default()
        };
        GateService::new(cfg, Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn returns_body_output() {
        let svc = service(1);
        let pages = run_heavy(&svc, || Ok::<_, String>(12)).await.unwrap();
        assert_eq!(pages, 12);
    }

    #[tokio::test]
    async fn body_error_becomes_job_error() {
        let svc = service(1);
        let err = run_heavy(&svc, || Err::<(), _>("encrypted pdf")).await.unwrap_err();
        assert!(matches!(err, ApiError::Job(JobError::Failed(m)) if m == "encrypted pdf"));
    }

    #[tokio::test]
    async fn busy_service_rejects_immediately() {
        let svc = service(1);
        let _held = svc.controller().try_admit().unwrap();

        let started = std::time::Instant::now();
        let err = run_heavy(&svc, || Ok::<_, String>(())).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(AdmitError::CapacityExceeded)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
