//! Seam for scrape-style metrics exporters.
use pressgate_model::StatusSnapshot;

use crate::error::CoreError;

/// Renders metrics for the `/metrics` endpoint.
///
/// Counters are usually fed through [`crate::Observer`]; gauges are refreshed
/// from `status` at scrape time.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Value for the `Content-Type` header.
    fn content_type(&self) -> &'static str;

    fn render(&self, status: &StatusSnapshot) -> Result<Vec<u8>, CoreError>;
}
