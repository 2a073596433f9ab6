//! Shared data types for the pressgate admission layer.
//!
//! Everything here is plain data: no locks, no runtime. The core crate owns the
//! behaviour, the api and observe crates render these types.
mod domain;
pub use domain::*;
