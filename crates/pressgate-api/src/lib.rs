//! Admin and job-facing HTTP surface of the admission layer.
mod error;
pub use error::ApiError;

mod handler;
pub use handler::{ApiHandler, Health};

mod adapter;
pub use adapter::GateApiAdapter;

mod heavy;
pub use heavy::run_heavy;

#[cfg(feature = "http")]
mod dashboard;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{ADMIN_KEY_HEADER, HttpApi};

#[cfg(feature = "http")]
pub use axum;
