use async_trait::async_trait;
use pressgate_core::GateService;
use pressgate_model::StatusSnapshot;

use crate::error::ApiError;
use crate::handler::{ApiHandler, Health};

/// Adapter that serves the admin surface straight from a [`GateService`].
pub struct GateApiAdapter {
    service: GateService,
}

impl GateApiAdapter {
    pub fn new(service: GateService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &GateService {
        &self.service
    }
}

#[async_trait]
impl ApiHandler for GateApiAdapter {
    async fn health(&self) -> Health {
        Health {
            status: "healthy".to_string(),
            version: self.service.reporter().version().to_string(),
        }
    }

    async fn status(&self, key: Option<&str>) -> Result<StatusSnapshot, ApiError> {
        Ok(self.service.authorized_snapshot(key)?)
    }

    async fn metrics(&self, key: Option<&str>) -> Result<(&'static str, Vec<u8>), ApiError> {
        let snapshot = self.service.authorized_snapshot(key)?;
        let backend = self
            .service
            .metrics()
            .ok_or_else(|| ApiError::NotFound("metrics exporter not configured".into()))?;
        let body = backend.render(&snapshot)?;
        Ok((backend.content_type(), body))
    }
}
