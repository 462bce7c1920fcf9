//! Video transformation worker.
//!
//! This crate provides:
//! - The orchestrator driving a job from submission to a terminal state
//! - Read-time staleness detection for jobs stuck in `processing`
//! - A bounded worker pool consuming the in-process queue
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod staleness;

#[cfg(test)]
mod testing;

pub use config::WorkerConfig;
pub use error::{SubmitError, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::{Orchestrator, StatusRead, SubmitOutcome};
pub use staleness::{StalenessMonitor, STALE_DEADLINE};
