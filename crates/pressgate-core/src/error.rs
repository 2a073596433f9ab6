use pressgate_model::RejectReason;
use thiserror::Error;

/// The `Rejected` arm of an admission attempt.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdmitError {
    #[error("capacity exceeded: no free execution slot")]
    CapacityExceeded,
    #[error("wait queue is full")]
    QueueFull,
    #[error("timed out waiting for an execution slot")]
    AcquireTimeout,
    #[error("caller cancelled while waiting for a slot")]
    Cancelled,
}

impl AdmitError {
    pub fn reason(&self) -> RejectReason {
        match self {
            AdmitError::CapacityExceeded => RejectReason::CapacityExceeded,
            AdmitError::QueueFull => RejectReason::QueueFull,
            AdmitError::AcquireTimeout => RejectReason::AcquireTimeout,
            AdmitError::Cancelled => RejectReason::Cancelled,
        }
    }
}

impl From<RejectReason> for AdmitError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::CapacityExceeded => AdmitError::CapacityExceeded,
            RejectReason::QueueFull => AdmitError::QueueFull,
            RejectReason::AcquireTimeout => AdmitError::AcquireTimeout,
            RejectReason::Cancelled => AdmitError::Cancelled,
        }
    }
}

/// Failure of an admitted job body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job failed: {0}")]
    Failed(String),
    #[error("job panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} (expected a non-negative integer)")]
    Invalid { key: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Admin surface key check failure. Never carries the configured key.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("admin surface disabled")]
    Disabled,
    #[error("unauthorized")]
    Unauthorized,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("metrics error: {0}")]
    Metrics(String),
}
