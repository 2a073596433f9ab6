//! # Watchdogs
//!
//! - [`ExecutionWatchdog`] times admitted job bodies against a soft deadline. It only
//!   observes: the body always runs to completion and keeps its slot until then.
//! - [`MemoryWatchdog`] samples process RSS on a fixed interval and terminates the
//!   process once it crosses `MAX_RSS_MB`.
mod exec;
mod memory;

pub use exec::{ExecutionWatchdog, JobBody, JobReport, JobRunner};
pub use memory::{
    ExitAction, MemoryStats, MemoryVerdict, MemoryWatchdog, ProcRssSampler, ProcessExit,
    RssSampler,
};
