//! Queue entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vproc_models::JobId;

/// A job waiting for a worker. Parameters stay in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueJob {
    pub job_id: JobId,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueJob {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            enqueued_at: Utc::now(),
        }
    }

    /// Time spent waiting since enqueue.
    pub fn wait_time(&self) -> chrono::Duration {
        Utc::now() - self.enqueued_at
    }
}
