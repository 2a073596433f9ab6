use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TEXT_FORMAT, TextEncoder,
};
use pressgate_core::{CoreError, MetricsBackend, Observer};
use pressgate_model::{Event, EventKind, RejectReason, StatusSnapshot};

use crate::error::MetricsError;

const NAMESPACE: &str = "pressgate";

/// Seconds; jobs wait up to the acquire timeout and run for minutes at worst.
const WAIT_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];
const DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,

    admitted: IntCounter,
    rejected: IntCounterVec,
    completed: IntCounterVec,
    timed_out: IntCounter,
    wait_seconds: Histogram,
    duration_seconds: Histogram,

    active: IntGauge,
    queued: IntGauge,
    slots: IntGauge,
    queue_capacity: IntGauge,
    rss: IntGauge,
    rss_peak: IntGauge,
    rss_threshold: IntGauge,
}

impl PrometheusMetrics {
    /// Metrics registered in a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_registry(Registry::new())
    }

    /// Metrics registered in `registry`, e.g. one shared with other exporters.
    pub fn with_registry(registry: Registry) -> Result<Self, MetricsError> {
        let admitted = IntCounter::with_opts(opts(
            "jobs_admitted_total",
            "Jobs granted an execution slot",
        ))?;
        let rejected = IntCounterVec::new(
            opts("jobs_rejected_total", "Jobs refused a slot, by reason"),
            &["reason"],
        )?;
        let completed = IntCounterVec::new(
            opts("jobs_completed_total", "Job bodies that returned, by outcome"),
            &["outcome"],
        )?;
        let timed_out = IntCounter::with_opts(opts(
            "jobs_timed_out_total",
            "Jobs that ran past the soft deadline",
        ))?;
        let wait_seconds = Histogram::with_opts(
            HistogramOpts::new("job_wait_seconds", "Time spent in the wait queue")
                .namespace(NAMESPACE)
                .buckets(WAIT_BUCKETS.to_vec()),
        )?;
        let duration_seconds = Histogram::with_opts(
            HistogramOpts::new("job_duration_seconds", "Wall time of job bodies")
                .namespace(NAMESPACE)
                .buckets(DURATION_BUCKETS.to_vec()),
        )?;

        let active = IntGauge::with_opts(opts("active_jobs", "Jobs holding a slot"))?;
        let queued = IntGauge::with_opts(opts("queued_jobs", "Jobs waiting for a slot"))?;
        let slots = IntGauge::with_opts(opts("slots", "Configured execution slots"))?;
        let queue_capacity =
            IntGauge::with_opts(opts("queue_capacity", "Configured wait-queue capacity"))?;
        let rss = IntGauge::with_opts(opts("rss_bytes", "Last sampled resident set size"))?;
        let rss_peak =
            IntGauge::with_opts(opts("rss_peak_bytes", "Peak sampled resident set size"))?;
        let rss_threshold = IntGauge::with_opts(opts(
            "rss_threshold_bytes",
            "Resident set size that triggers a process exit (0 = disabled)",
        ))?;

        registry.register(Box::new(admitted.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(completed.clone()))?;
        registry.register(Box::new(timed_out.clone()))?;
        registry.register(Box::new(wait_seconds.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;
        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(queued.clone()))?;
        registry.register(Box::new(slots.clone()))?;
        registry.register(Box::new(queue_capacity.clone()))?;
        registry.register(Box::new(rss.clone()))?;
        registry.register(Box::new(rss_peak.clone()))?;
        registry.register(Box::new(rss_threshold.clone()))?;

        // Every reason shows up as 0 before the first rejection.
        for reason in RejectReason::ALL {
            rejected.with_label_values(&[reason.as_str()]);
        }

        Ok(Self {
            registry,
            admitted,
            rejected,
            completed,
            timed_out,
            wait_seconds,
            duration_seconds,
            active,
            queued,
            slots,
            queue_capacity,
            rss,
            rss_peak,
            rss_threshold,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Copy point-in-time values from `status` into the gauges.
    pub fn refresh(&self, status: &StatusSnapshot) {
        self.active.set(status.counters.active as i64);
        self.queued.set(status.counters.queued as i64);
        self.slots.set(status.limits.max_concurrent_jobs as i64);
        self.queue_capacity.set(status.limits.max_job_queue as i64);
        self.rss.set(status.memory.last_sampled_rss as i64);
        self.rss_peak.set(status.memory.peak_rss as i64);
        self.rss_threshold
            .set((status.memory.threshold_mb.saturating_mul(1024 * 1024)) as i64);
    }

    pub fn encode(&self) -> Result<Vec<u8>, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        Ok(buf)
    }
}

impl Observer for PrometheusMetrics {
    fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::JobAdmitted => {
                self.admitted.inc();
                let wait_ms = event.wait_ms.unwrap_or(0);
                self.wait_seconds.observe(wait_ms as f64 / 1000.0);
            }
            EventKind::JobRejected => {
                let reason = event.reason.map(|r| r.as_str()).unwrap_or("unknown");
                self.rejected.with_label_values(&[reason]).inc();
            }
            EventKind::SoftDeadlineExceeded => self.timed_out.inc(),
            EventKind::JobCompleted => {
                let outcome = if event.failed { "failed" } else { "ok" };
                self.completed.with_label_values(&[outcome]).inc();
                if let Some(ms) = event.elapsed_ms {
                    self.duration_seconds.observe(ms as f64 / 1000.0);
                }
            }
            EventKind::MemorySampled => {
                if let Some(rss) = event.rss {
                    self.rss.set(rss as i64);
                }
            }
            EventKind::JobQueued
            | EventKind::SlotReleased
            | EventKind::JobStarted
            | EventKind::MemoryThresholdBreached => {}
        }
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn content_type(&self) -> &'static str {
        TEXT_FORMAT
    }

    fn render(&self, status: &StatusSnapshot) -> Result<Vec<u8>, CoreError> {
        self.refresh(status);
        Ok(self.encode()?)
    }
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help).namespace(NAMESPACE)
}
