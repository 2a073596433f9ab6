use async_trait::async_trait;
use pressgate_model::StatusSnapshot;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Liveness payload for `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
}

/// Backend of the admin surface.
///
/// [`crate::GateApiAdapter`] serves a [`pressgate_core::GateService`]; custom
/// implementations can add their own auth or aggregation.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    async fn health(&self) -> Health;

    /// Status snapshot for a caller presenting `key`.
    async fn status(&self, key: Option<&str>) -> Result<StatusSnapshot, ApiError>;

    /// Metrics exposition as `(content type, body)`.
    async fn metrics(&self, key: Option<&str>) -> Result<(&'static str, Vec<u8>), ApiError>;
}
