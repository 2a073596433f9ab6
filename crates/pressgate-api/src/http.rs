use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, header::CONTENT_TYPE},
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Deserialize;
use tracing::debug;

use crate::{dashboard, error::ApiError, handler::ApiHandler};

/// Header carrying the admin key when it is not passed as `?key=`.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// HTTP admin surface builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /health - Liveness
    /// - GET /admin/status - JSON status snapshot (admin key)
    /// - GET /admin - HTML dashboard (admin key)
    /// - GET /metrics - Prometheus exposition (admin key)
    ///
    /// Heavy job routes are mounted by the application and call [`crate::run_heavy`].
    pub fn router(self) -> Router {
        Router::new()
            .route("/health", get(health::<H>))
            .route("/admin/status", get(admin_status::<H>))
            .route("/admin", get(admin_page::<H>))
            .route("/metrics", get(metrics::<H>))
            .with_state(self.handler)
    }
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct AdminParams {
    key: Option<String>,
}

/// `?key=` wins over the header, as both are accepted.
fn presented_key<'a>(params: &'a AdminParams, headers: &'a HeaderMap) -> Option<&'a str> {
    params
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .or_else(|| headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
async fn health<H>(State(handler): State<Arc<H>>) -> impl IntoResponse
where
    H: ApiHandler,
{
    Json(handler.health().await)
}

/// GET /admin/status
async fn admin_status<H>(
    State(handler): State<Arc<H>>,
    Query(params): Query<AdminParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let snapshot = handler.status(presented_key(&params, &headers)).await?;
    debug!(active = snapshot.counters.active, queued = snapshot.counters.queued, "status served");
    Ok(Json(snapshot))
}

/// GET /admin
async fn admin_page<H>(
    State(handler): State<Arc<H>>,
    Query(params): Query<AdminParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let snapshot = handler.status(presented_key(&params, &headers)).await?;
    Ok(Html(dashboard::render(&snapshot)))
}

/// GET /metrics
async fn metrics<H>(
    State(handler): State<Arc<H>>,
    Query(params): Query<AdminParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let (content_type, body) = handler.metrics(presented_key(&params, &headers)).await?;
    let content_type = HeaderValue::from_str(content_type)
        .map_err(|e| ApiError::Internal(format!("bad content type: {e}")))?;
    Ok(([(CONTENT_TYPE, content_type)], body))
}
