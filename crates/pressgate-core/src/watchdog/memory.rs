use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pressgate_model::{Event, EventKind, MemorySnapshot, RssBytes, bytes_to_mb};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::{observer::ObserverSet, system};

const MIB: u64 = 1024 * 1024;

/// Source of resident-set-size readings.
pub trait RssSampler: Send + Sync + 'static {
    /// Current RSS in bytes, `None` when it cannot be determined.
    fn sample(&self) -> Option<RssBytes>;
}

/// Reads RSS from `/proc/self` (see [`system::current_rss_bytes`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcRssSampler;

impl RssSampler for ProcRssSampler {
    fn sample(&self) -> Option<RssBytes> {
        system::current_rss_bytes()
    }
}

/// What to do once the ceiling is crossed.
pub trait ExitAction: Send + Sync + 'static {
    fn exit(&self, rss: RssBytes, threshold_mb: u64);
}

/// Terminates the process with status 1 and lets the supervisor restart it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl ExitAction for ProcessExit {
    fn exit(&self, rss: RssBytes, threshold_mb: u64) {
        error!(
            rss_mb = bytes_to_mb(rss),
            threshold_mb, "memory ceiling exceeded, terminating process"
        );
        std::process::exit(1);
    }
}

/// Shared memory readings. Updated by the watchdog loop, read by the status surface.
#[derive(Debug, Clone)]
pub struct MemoryStats {
    inner: Arc<StatsInner>,
    threshold_mb: u64,
}

#[derive(Debug, Default)]
struct StatsInner {
    last: AtomicU64,
    peak: AtomicU64,
    samples: AtomicU64,
}

impl MemoryStats {
    pub fn new(threshold_mb: u64) -> Self {
        Self {
            inner: Arc::new(StatsInner::default()),
            threshold_mb,
        }
    }

    pub fn record(&self, rss: RssBytes) {
        self.inner.last.store(rss, Ordering::Relaxed);
        self.inner.peak.fetch_max(rss, Ordering::Relaxed);
        self.inner.samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last(&self) -> RssBytes {
        self.inner.last.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> RssBytes {
        self.inner.peak.load(Ordering::Relaxed)
    }

    pub fn samples(&self) -> u64 {
        self.inner.samples.load(Ordering::Relaxed)
    }

    pub fn threshold_mb(&self) -> u64 {
        self.threshold_mb
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            last_sampled_rss: self.last(),
            peak_rss: self.peak(),
            samples: self.samples(),
            watchdog_enabled: self.threshold_mb > 0,
            threshold_mb: self.threshold_mb,
        }
    }
}

/// Result of one sampling round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryVerdict {
    /// RSS could not be read; nothing recorded.
    Unknown,
    Within { rss: RssBytes },
    Breached { rss: RssBytes },
}

/// Periodic RSS sampler that terminates the process above `threshold_mb`.
///
/// Sampling always runs so the status surface has readings; only the exit is
/// suppressed when the threshold is 0.
pub struct MemoryWatchdog {
    interval: Duration,
    sampler: Arc<dyn RssSampler>,
    exit: Arc<dyn ExitAction>,
    stats: MemoryStats,
    observers: ObserverSet,
}

impl MemoryWatchdog {
    pub fn new(threshold_mb: u64, interval: Duration, observers: ObserverSet) -> Self {
        Self::with_stats(MemoryStats::new(threshold_mb), interval, observers)
    }

    /// Watchdog writing into existing `stats`; the ceiling is `stats.threshold_mb()`.
    pub fn with_stats(stats: MemoryStats, interval: Duration, observers: ObserverSet) -> Self {
        Self {
            interval,
            sampler: Arc::new(ProcRssSampler),
            exit: Arc::new(ProcessExit),
            stats,
            observers,
        }
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn RssSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_exit_action(mut self, exit: Arc<dyn ExitAction>) -> Self {
        self.exit = exit;
        self
    }

    /// Handle to the readings; stays valid after the watchdog is spawned.
    pub fn stats(&self) -> MemoryStats {
        self.stats.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Take one sample and compare it with the ceiling. Does not exit.
    pub fn check_once(&self) -> MemoryVerdict {
        let rss = match self.sampler.sample() {
            Some(rss) if rss > 0 => rss,
            _ => {
                trace!("rss unavailable");
                return MemoryVerdict::Unknown;
            }
        };
        self.stats.record(rss);
        self.observers
            .publish(Event::new(EventKind::MemorySampled).with_rss(rss));

        let threshold_mb = self.stats.threshold_mb();
        if threshold_mb > 0 && rss > threshold_mb.saturating_mul(MIB) {
            MemoryVerdict::Breached { rss }
        } else {
            MemoryVerdict::Within { rss }
        }
    }

    /// Run the sampling loop on the current runtime until `cancel` fires or the
    /// ceiling is breached.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let threshold_mb = self.stats.threshold_mb();
        info!(
            threshold_mb,
            interval_s = self.interval.as_secs(),
            enabled = threshold_mb > 0,
            "memory watchdog started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("memory watchdog stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let MemoryVerdict::Breached { rss } = self.check_once() {
                        self.observers.publish(
                            Event::new(EventKind::MemoryThresholdBreached)
                                .with_rss(rss)
                                .with_threshold_mb(threshold_mb),
                        );
                        self.exit.exit(rss, threshold_mb);
                        break;
                    }
                }
            }
        }
    }
}
