use std::{fmt, time::Duration};

use pressgate_model::CapacityLimits;

use crate::error::ConfigError;

pub const DEFAULT_SERVICE_NAME: &str = "PDF Processing API";

/// Runtime configuration of the admission layer.
///
/// Every key is optional; missing or empty values fall back to [`ServiceConfig::default`].
#[derive(Clone)]
pub struct ServiceConfig {
    /// Title shown on the status surface.
    pub service_name: String,
    /// Size of the execution slot pool (N). Clamped to at least 1.
    pub max_concurrent_jobs: usize,
    /// Capacity of the wait queue (M). Zero means "never queue".
    pub max_job_queue: usize,
    /// Maximum time a caller waits for a slot. Zero selects fail-fast mode.
    pub job_acquire_timeout: Duration,
    /// Soft execution deadline. Zero disables overrun tracking.
    pub job_timeout: Duration,
    /// Resident memory ceiling in MiB. Zero disables the self-exit.
    pub max_rss_mb: u64,
    /// Memory watchdog sampling period.
    pub memory_sample_interval: Duration,
    /// Shared secret protecting the admin surface. `None` hides it entirely.
    pub admin_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            max_concurrent_jobs: 1,
            max_job_queue: 10,
            job_acquire_timeout: Duration::ZERO,
            job_timeout: Duration::from_secs(300),
            max_rss_mb: 0,
            memory_sample_interval: Duration::from_secs(5),
            admin_key: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("service_name", &self.service_name)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("max_job_queue", &self.max_job_queue)
            .field("job_acquire_timeout", &self.job_acquire_timeout)
            .field("job_timeout", &self.job_timeout)
            .field("max_rss_mb", &self.max_rss_mb)
            .field("memory_sample_interval", &self.memory_sample_interval)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key/value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cfg = Self {
            service_name: get("SERVICE_NAME").unwrap_or(defaults.service_name),
            max_concurrent_jobs: parse_count(&get, "MAX_CONCURRENT_JOBS", 1, 1)? as usize,
            max_job_queue: parse_count(&get, "MAX_JOB_QUEUE", 10, 0)? as usize,
            job_acquire_timeout: Duration::from_secs(parse_num(
                &get,
                "JOB_ACQUIRE_TIMEOUT_SECONDS",
                0,
            )?),
            job_timeout: Duration::from_secs(parse_num(&get, "JOB_TIMEOUT_SECONDS", 300)?),
            max_rss_mb: parse_num(&get, "MAX_RSS_MB", 0)?,
            memory_sample_interval: Duration::from_secs(parse_num(
                &get,
                "MEMORY_SAMPLE_INTERVAL_SECONDS",
                5,
            )?),
            admin_key: get("ADMIN_KEY"),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::Validation(
                "max_concurrent_jobs must be at least 1".into(),
            ));
        }
        if self.memory_sample_interval.is_zero() {
            return Err(ConfigError::Validation(
                "memory_sample_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn limits(&self) -> CapacityLimits {
        CapacityLimits {
            max_concurrent_jobs: self.max_concurrent_jobs,
            max_job_queue: self.max_job_queue,
            acquire_timeout_secs: self.job_acquire_timeout.as_secs(),
            job_timeout_secs: self.job_timeout.as_secs(),
            max_rss_mb: self.max_rss_mb,
        }
    }

    /// Soft deadline, `None` when overrun tracking is off.
    pub fn soft_deadline(&self) -> Option<Duration> {
        (!self.job_timeout.is_zero()).then_some(self.job_timeout)
    }
}

/// Like [`parse_num`], but negative integers clamp to `min` instead of failing.
fn parse_count<G>(get: &G, key: &'static str, default: u64, min: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse_num(get, key, default) {
        Ok(v) => Ok(v.max(min)),
        Err(err) => match get(key).and_then(|raw| raw.parse::<i64>().ok()) {
            Some(_) => Ok(min),
            None => Err(err),
        },
    }
}

fn parse_num<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_documented_defaults() {
        let cfg = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.max_concurrent_jobs, 1);
        assert_eq!(cfg.max_job_queue, 10);
        assert_eq!(cfg.job_acquire_timeout, Duration::ZERO);
        assert_eq!(cfg.job_timeout, Duration::from_secs(300));
        assert_eq!(cfg.max_rss_mb, 0);
        assert_eq!(cfg.memory_sample_interval, Duration::from_secs(5));
        assert!(cfg.admin_key.is_none());
    }

    #[test]
    fn reads_every_key() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("MAX_CONCURRENT_JOBS", "4"),
            ("MAX_JOB_QUEUE", "0"),
            ("JOB_ACQUIRE_TIMEOUT_SECONDS", "5"),
            ("JOB_TIMEOUT_SECONDS", "60"),
            ("MAX_RSS_MB", "500"),
            ("MEMORY_SAMPLE_INTERVAL_SECONDS", "2"),
            ("ADMIN_KEY", "s3cret"),
            ("SERVICE_NAME", "Imposition"),
        ]))
        .unwrap();

        assert_eq!(cfg.max_concurrent_jobs, 4);
        assert_eq!(cfg.max_job_queue, 0);
        assert_eq!(cfg.job_acquire_timeout, Duration::from_secs(5));
        assert_eq!(cfg.job_timeout, Duration::from_secs(60));
        assert_eq!(cfg.max_rss_mb, 500);
        assert_eq!(cfg.memory_sample_interval, Duration::from_secs(2));
        assert_eq!(cfg.admin_key.as_deref(), Some("s3cret"));
        assert_eq!(cfg.service_name, "Imposition");
    }

    #[test]
    fn zero_concurrency_is_clamped_to_one() {
        let cfg = ServiceConfig::from_lookup(lookup(&[("MAX_CONCURRENT_JOBS", "0")])).unwrap();
        assert_eq!(cfg.max_concurrent_jobs, 1);
    }

    #[test]
    fn blank_admin_key_counts_as_unset() {
        let cfg = ServiceConfig::from_lookup(lookup(&[("ADMIN_KEY", "   ")])).unwrap();
        assert!(cfg.admin_key.is_none());
    }

    #[test]
    fn negative_capacities_are_clamped() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("MAX_CONCURRENT_JOBS", "-2"),
            ("MAX_JOB_QUEUE", "-3"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_concurrent_jobs, 1);
        assert_eq!(cfg.max_job_queue, 0);
    }

    #[test]
    fn garbage_number_is_rejected_with_key() {
        let err = ServiceConfig::from_lookup(lookup(&[("MAX_JOB_QUEUE", "ten")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "MAX_JOB_QUEUE",
                value: "ten".into()
            }
        );

        let err =
            ServiceConfig::from_lookup(lookup(&[("JOB_TIMEOUT_SECONDS", "-1")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "JOB_TIMEOUT_SECONDS",
                ..
            }
        ));
    }

    #[test]
    fn zero_sample_interval_fails_validation() {
        let err = ServiceConfig::from_lookup(lookup(&[("MEMORY_SAMPLE_INTERVAL_SECONDS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn debug_output_redacts_admin_key() {
        let cfg = ServiceConfig {
            admin_key: Some("topsecret".into()),
            ..Default::default()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("topsecret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn zero_job_timeout_disables_soft_deadline() {
        let cfg = ServiceConfig {
            job_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(cfg.soft_deadline().is_none());
        assert_eq!(
            ServiceConfig::default().soft_deadline(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn limits_mirror_config() {
        let cfg = ServiceConfig {
            max_concurrent_jobs: 2,
            max_rss_mb: 128,
            ..Default::default()
        };
        let limits = cfg.limits();
        assert_eq!(limits.max_concurrent_jobs, 2);
        assert_eq!(limits.max_job_queue, 10);
        assert!(limits.is_fail_fast());
        assert!(limits.memory_watchdog_enabled());
    }
}
