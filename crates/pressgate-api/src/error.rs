use pressgate_core::{AdmitError, AuthError, CoreError, JobError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No slot for this job. Transient overload; the client should retry.
    #[error("rejected: {0}")]
    Rejected(#[from] AdmitError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl ApiError {
    /// Machine-readable `error_type` of the JSON body.
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Rejected(e) => e.reason().as_str(),
            ApiError::Job(JobError::Failed(_)) => "job_failed",
            ApiError::Job(JobError::Panicked(_)) => "job_panicked",
            ApiError::Auth(AuthError::Disabled) | ApiError::NotFound(_) => "not_found",
            ApiError::Auth(AuthError::Unauthorized) => "unauthorized",
            ApiError::Internal(_) | ApiError::Core(_) => "internal",
        }
    }
}

#[cfg(feature = "http")]
mod http {
    use axum::{
        Json,
        http::{HeaderValue, StatusCode, header::RETRY_AFTER},
        response::{IntoResponse, Response},
    };
    use pressgate_core::{AuthError, JobError};
    use serde_json::json;
    use tracing::error;

    use super::ApiError;

    impl ApiError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                ApiError::Rejected(_) => StatusCode::SERVICE_UNAVAILABLE,
                ApiError::Job(JobError::Failed(_)) => StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::Job(JobError::Panicked(_)) => StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::Auth(AuthError::Disabled) | ApiError::NotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ApiError::Auth(AuthError::Unauthorized) => StatusCode::UNAUTHORIZED,
                ApiError::Internal(_) | ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }

        /// Client-facing text. Auth failures say nothing beyond their status.
        fn detail(&self) -> String {
            match self {
                ApiError::Rejected(_) => "Server is busy, please retry shortly".to_string(),
                ApiError::Job(JobError::Failed(msg)) => msg.clone(),
                ApiError::Auth(AuthError::Disabled) => "Not found".to_string(),
                ApiError::Auth(AuthError::Unauthorized) => "Unauthorized".to_string(),
                ApiError::NotFound(_) => "Not found".to_string(),
                ApiError::Job(JobError::Panicked(_))
                | ApiError::Internal(_)
                | ApiError::Core(_) => "Internal server error".to_string(),
            }
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
                error!(error = %self, "request failed");
            }

            let body = Json(json!({
                "detail": self.detail(),
                "error_type": self.error_type(),
            }));
            let mut response = (status, body).into_response();
            if matches!(self, ApiError::Rejected(_)) {
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from_static("1"));
            }
            response
        }
    }
}
