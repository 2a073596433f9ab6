//! Server-rendered admin page.
use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use pressgate_model::{JobState, StatusSnapshot, bytes_to_mb};

const STYLE: &str = r#"
    body { font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial; background:#0b1220; color:#e5e7eb; margin:0; }
    .wrap { max-width: 980px; margin: 0 auto; padding: 24px; }
    .card { background: rgba(255,255,255,0.06); border:1px solid rgba(255,255,255,0.10); border-radius:16px; padding:16px; }
    .grid { display:grid; grid-template-columns: repeat(12, 1fr); gap: 14px; }
    .span4 { grid-column: span 4; }
    .span6 { grid-column: span 6; }
    .span12 { grid-column: span 12; }
    .k { color:#9ca3af; font-size:12px; text-transform: uppercase; letter-spacing:.12em; }
    .v { font-size:28px; font-weight:700; margin-top:6px; }
    .h1 { font-size: 22px; font-weight:700; margin: 8px 0 18px; }
    .row { display:flex; justify-content:space-between; gap:10px; padding:10px 0; border-bottom: 1px solid rgba(255,255,255,0.08); }
    .row:last-child { border-bottom: none; }
    .badge { display:inline-flex; padding:4px 10px; border-radius:999px; font-size:12px; font-weight:600; background: rgba(0,184,212,0.18); color: #a5f3fc; border: 1px solid rgba(0,184,212,0.25); }
    .warn { color:#fca5a5; }
    a { color:#7dd3fc; text-decoration:none; }
    .muted { color:#9ca3af; font-size:13px; }
    @media (max-width: 900px) { .span4, .span6 { grid-column: span 12; } }
"#;

/// Escape text for HTML element and attribute context.
pub(crate) fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn unix_seconds(at: Option<SystemTime>) -> String {
    at.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn row(out: &mut String, key: &str, value: &str) {
    let _ = write!(
        out,
        r#"<div class="row"><div>{}</div><div>{}</div></div>"#,
        escape(key),
        escape(value)
    );
}

/// Render the dashboard. The admin key never appears in the output; links
/// point at the bare paths and the operator re-supplies the key.
pub(crate) fn render(s: &StatusSnapshot) -> String {
    let c = &s.counters;
    let m = &s.memory;
    let title = escape(&s.service);

    let mut system = String::new();
    row(&mut system, "PID", &s.system.pid.to_string());
    row(&mut system, "Host", &s.system.host);
    row(&mut system, "Platform", &format!("{} / {}", s.system.platform, s.system.arch));
    row(&mut system, "Uptime", &format!("{}s", s.uptime_seconds));
    let [l1, l5, l15] = s.system.load_avg;
    row(&mut system, "Load avg", &format!("{l1:.2}, {l5:.2}, {l15:.2}"));
    row(&mut system, "Peak RSS", &format!("{:.0} MB", bytes_to_mb(m.peak_rss)));

    let mut counters = String::new();
    row(&mut counters, "Total admitted", &c.total_admitted.to_string());
    row(&mut counters, "Total finished", &c.total_finished.to_string());
    row(&mut counters, "Total rejected", &c.total_rejected.to_string());
    row(&mut counters, "Rejected: capacity", &c.rejected.capacity_exceeded.to_string());
    row(&mut counters, "Rejected: queue full", &c.rejected.queue_full.to_string());
    row(&mut counters, "Rejected: wait timeout", &c.rejected.acquire_timeout.to_string());
    row(&mut counters, "Cancelled while waiting", &c.rejected.cancelled.to_string());
    row(&mut counters, "Soft deadline overruns", &c.total_timed_out.to_string());
    row(&mut counters, "Last started", &unix_seconds(c.last_started_at));
    row(&mut counters, "Last finished", &unix_seconds(c.last_finished_at));

    let mut jobs = String::new();
    if s.jobs.is_empty() {
        jobs.push_str(r#"<div class="muted">No jobs in flight</div>"#);
    }
    for job in &s.jobs {
        let running = format!("{}s", job.running_for().as_secs());
        let label = if job.state == JobState::Queued {
            r#"<span class="muted">queued</span>"#.to_string()
        } else if job.overdue {
            format!(r#"<span class="warn">{} (overdue)</span>"#, escape(&running))
        } else {
            escape(&running)
        };
        let _ = write!(
            jobs,
            r#"<div class="row"><div>{}</div><div>{}</div></div>"#,
            escape(&job.id.to_string()),
            label
        );
    }

    let watchdog = if m.watchdog_enabled {
        format!("on, limit {} MB", m.threshold_mb)
    } else {
        "off".to_string()
    };

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>{title} &bull; Admin</title>
  <style>{STYLE}</style>
</head>
<body>
  <div class="wrap">
    <div class="h1">{title} <span class="muted">v{version}</span> <span class="badge">admin</span></div>
    <div class="grid">
      <div class="card span4">
        <div class="k">Active jobs</div>
        <div class="v">{active}</div>
        <div class="muted">Max concurrent: {max_concurrent}</div>
      </div>
      <div class="card span4">
        <div class="k">Queued jobs</div>
        <div class="v">{queued}</div>
        <div class="muted">Max queue: {max_queue}, wait up to {acquire}s</div>
      </div>
      <div class="card span4">
        <div class="k">RSS memory</div>
        <div class="v">{rss:.0} MB</div>
        <div class="muted">Watchdog: {watchdog}</div>
      </div>
      <div class="card span6">
        <div class="k">System</div>
        {system}
      </div>
      <div class="card span6">
        <div class="k">Admission counters</div>
        {counters}
      </div>
      <div class="card span12">
        <div class="k">Jobs in flight (soft deadline {deadline}s)</div>
        {jobs}
      </div>
      <div class="card span12">
        <div class="k">Useful links</div>
        <div class="row"><div>JSON status</div><div><a href="/admin/status">/admin/status</a></div></div>
        <div class="row"><div>Metrics</div><div><a href="/metrics">/metrics</a></div></div>
        <div class="row"><div>Health</div><div><a href="/health">/health</a></div></div>
      </div>
    </div>
  </div>
</body>
</html>"#,
        version = escape(&s.version),
        active = c.active,
        max_concurrent = s.limits.max_concurrent_jobs,
        queued = c.queued,
        max_queue = s.limits.max_job_queue,
        acquire = s.limits.acquire_timeout_secs,
        rss = bytes_to_mb(m.last_sampled_rss),
        watchdog = escape(&watchdog),
        deadline = s.limits.job_timeout_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressgate_model::{
        AdmissionCounters, CapacityLimits, JobId, JobRecord, MemorySnapshot, SystemInfo,
    };
    use std::time::Duration;

    fn snapshot(service: &str) -> StatusSnapshot {
        let mut overdue = JobRecord::admitted(JobId::new(), Duration::ZERO);
        overdue.start(Duration::from_secs(1));
        overdue.mark_overdue();
        StatusSnapshot {
            service: service.into(),
            version: "0.0.1".into(),
            started_at: SystemTime::now(),
            uptime_seconds: 90,
            limits: CapacityLimits::default(),
            counters: AdmissionCounters {
                active: 1,
                total_admitted: 4,
                ..Default::default()
            },
            memory: MemorySnapshot {
                last_sampled_rss: 300 * 1024 * 1024,
                watchdog_enabled: true,
                threshold_mb: 500,
                ..Default::default()
            },
            system: SystemInfo {
                pid: 7,
                host: "press-01".into(),
                platform: "linux".into(),
                arch: "x86_64".into(),
                load_avg: [0.5, 0.25, 0.1],
            },
            jobs: vec![overdue, JobRecord::queued(JobId::new())],
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn renders_counters_and_system_facts() {
        let html = render(&snapshot("PDF Processing API"));
        assert!(html.contains("<title>PDF Processing API &bull; Admin</title>"));
        assert!(html.contains(r#"<div class="v">300 MB</div>"#));
        assert!(html.contains("on, limit 500 MB"));
        assert!(html.contains("press-01"));
        assert!(html.contains("(overdue)"));
        assert!(html.contains(r#"<span class="muted">queued</span>"#));
        assert!(html.contains("0.50, 0.25, 0.10"));
    }

    #[test]
    fn service_name_cannot_inject_markup() {
        let html = render(&snapshot("<script>alert(1)</script>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
