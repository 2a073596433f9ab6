mod jobs;
mod signals;
mod timing;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::middleware;
use pressgate_api::{GateApiAdapter, HttpApi};
use pressgate_core::{GateService, Observer, ServiceConfig};
use pressgate_observe::{Journal, LoggerConfig, logger_init};
use pressgate_prometheus::PrometheusMetrics;
use tracing::info;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let log_cfg = LoggerConfig::from_env().context("logger config")?;
    logger_init(&log_cfg).context("logger init")?;

    // 2) Admission layer
    let config = ServiceConfig::from_env().context("service config")?;
    info!(?config, "configuration loaded");

    let metrics = Arc::new(PrometheusMetrics::new().context("prometheus registry")?);
    let observers: Vec<Arc<dyn Observer>> = vec![
        Arc::new(Journal::new()) as Arc<dyn Observer>,
        metrics.clone() as Arc<dyn Observer>,
    ];
    let service = GateService::new(config, observers)?.with_metrics(metrics);

    // 3) Memory watchdog
    let watchdog = service.start_memory_watchdog();

    // 4) HTTP
    let admin = HttpApi::new(Arc::new(GateApiAdapter::new(service.clone()))).router();
    let app = admin
        .merge(jobs::router(service.clone()))
        .layer(middleware::from_fn(timing::process_time));

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .context("BIND_ADDR")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, admin = service.auth().is_enabled(), "listening");

    let shutdown = service.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = signals::wait_for_shutdown_signal().await {
                tracing::error!(error = %e, "signal handler failed");
            }
            shutdown.shutdown();
        })
        .await
        .context("http server")?;

    let _ = watchdog.await;
    info!("bye");
    Ok(())
}
