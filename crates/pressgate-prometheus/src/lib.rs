//! Prometheus metrics for the pressgate admission layer.
//!
//! [`PrometheusMetrics`] is both an [`pressgate_core::Observer`] (counters and
//! histograms fed by admission and watchdog events) and a
//! [`pressgate_core::MetricsBackend`] (gauges refreshed from the status snapshot
//! at scrape time, text exposition).
//!
//! ## Metrics
//! - `pressgate_jobs_admitted_total` - Counter
//! - `pressgate_jobs_rejected_total{reason}` - Counter
//! - `pressgate_jobs_completed_total{outcome}` - Counter (`ok`, `failed`)
//! - `pressgate_jobs_timed_out_total` - Counter
//! - `pressgate_job_wait_seconds` - Histogram
//! - `pressgate_job_duration_seconds` - Histogram
//! - `pressgate_active_jobs`, `pressgate_queued_jobs` - Gauge
//! - `pressgate_slots`, `pressgate_queue_capacity` - Gauge
//! - `pressgate_rss_bytes`, `pressgate_rss_peak_bytes`, `pressgate_rss_threshold_bytes` - Gauge
//!
//! This crate does not serve HTTP; `pressgate-api` mounts `/metrics`.
mod backend;
mod error;

pub use backend::PrometheusMetrics;
pub use error::MetricsError;

pub use prometheus::{Encoder, Registry, TextEncoder};
