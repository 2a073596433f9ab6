//! Process and host probes used by the status surface and the memory watchdog.
use std::{fs, sync::OnceLock, time::Instant};

use pressgate_model::{RssBytes, SystemInfo};

static START_TIME: OnceLock<Instant> = OnceLock::new();

const FALLBACK_PAGE_SIZE: u64 = 4096;

/// Pin process start time. Later calls are no-ops.
pub fn init_uptime() {
    START_TIME.get_or_init(Instant::now);
}

/// Seconds since [`init_uptime`] (or the first call to this function).
pub fn uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_secs()
}

#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

pub fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 1, 5 and 15 minute load averages; zeros where the platform has none.
pub fn load_average() -> [f64; 3] {
    #[cfg(unix)]
    {
        let mut avg = [0f64; 3];
        let n = unsafe { libc::getloadavg(avg.as_mut_ptr(), 3) };
        if n == 3 {
            return avg;
        }
    }
    [0.0; 3]
}

pub fn system_info() -> SystemInfo {
    SystemInfo {
        pid: std::process::id(),
        host: host_name(),
        platform: platform().to_string(),
        arch: arch().to_string(),
        load_avg: load_average(),
    }
}

/// Best-effort resident set size of the current process.
///
/// Tries `/proc/self/status` (`VmRSS`), then `/proc/self/statm` times the page size.
/// Returns `None` when neither is readable (non-Linux hosts).
pub fn current_rss_bytes() -> Option<RssBytes> {
    if let Ok(status) = fs::read_to_string("/proc/self/status")
        && let Some(rss) = parse_vm_rss(&status)
    {
        return Some(rss);
    }
    let statm = fs::read_to_string("/proc/self/statm").ok()?;
    let pages = parse_statm_resident_pages(&statm)?;
    Some(pages.saturating_mul(page_size()))
}

/// `VmRSS:   123456 kB` -> bytes.
pub(crate) fn parse_vm_rss(status: &str) -> Option<RssBytes> {
    status.lines().find_map(|line| {
        let value = line.strip_prefix("VmRSS:")?;
        let kib = value.split_whitespace().next()?.parse::<u64>().ok()?;
        Some(kib * 1024)
    })
}

/// Second field of `/proc/self/statm` is resident pages.
pub(crate) fn parse_statm_resident_pages(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse::<u64>().ok()
}

fn page_size() -> u64 {
    #[cfg(unix)]
    {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as u64;
        }
    }
    FALLBACK_PAGE_SIZE
}
