use pressgate_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),
}

impl From<MetricsError> for CoreError {
    fn from(e: MetricsError) -> Self {
        CoreError::Metrics(e.to_string())
    }
}
