//! Admission control and resource governance for a CPU-heavy document service.
//!
//! - [`AdmissionController`] bounds concurrent jobs with a slot pool and a FIFO wait queue.
//! - [`ExecutionWatchdog`] flags jobs that overrun a soft deadline.
//! - [`MemoryWatchdog`] terminates the process when RSS crosses a ceiling.
//! - [`StatusReporter`] and [`AdminAuth`] back the key-protected admin surface.
//! - [`GateService`] wires all of the above from a [`ServiceConfig`].
pub mod admission;
pub use admission::{AdmissionController, SlotPermit, SlotPool};

pub mod config;
pub use config::ServiceConfig;

pub mod error;
pub use error::{AdmitError, AuthError, ConfigError, CoreError, JobError};

pub mod metrics;
pub use metrics::MetricsBackend;

pub mod observer;
pub use observer::{Observer, ObserverSet};

pub mod service;
pub use service::GateService;

pub mod status;
pub use status::{AdminAuth, StatusReporter};

pub mod system;

pub mod watchdog;
pub use watchdog::{
    ExecutionWatchdog, ExitAction, JobBody, JobReport, JobRunner, MemoryStats, MemoryVerdict,
    MemoryWatchdog, ProcRssSampler, ProcessExit, RssSampler,
};
