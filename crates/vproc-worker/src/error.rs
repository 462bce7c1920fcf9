//! Worker error types.

use thiserror::Error;
use vproc_models::{JobId, ValidationError};
use vproc_queue::QueueError;
use vproc_store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Faults while running a job. Transcode failures are not faults; they end
/// the job in `error`.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Executor error: {0}")]
    Executor(String),
}

impl WorkerError {
    pub fn executor(msg: impl Into<String>) -> Self {
        Self::Executor(msg.into())
    }
}

/// Why a submission produced no runnable job.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request was rejected; no job exists.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The job record could not be created.
    #[error("Failed to create processing job: {0}")]
    Store(#[from] StoreError),

    /// The job was created but could not be queued; it has been failed.
    #[error("Failed to queue job {job_id}: {source}")]
    Queue {
        job_id: JobId,
        #[source]
        source: QueueError,
    },
}
