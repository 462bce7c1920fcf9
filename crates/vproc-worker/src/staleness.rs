//! Read-time detection of jobs stuck in `processing`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use vproc_models::{Job, JobStatus, JobTransition};

/// How long a job may stay in `processing` before it is reported as timed out.
pub const STALE_DEADLINE: Duration = Duration::from_secs(300);

/// Decides whether a job has overrun its processing deadline.
///
/// Pure: it never writes and never touches the running transcode.
#[derive(Debug, Clone, Copy)]
pub struct StalenessMonitor {
    deadline: Duration,
}

impl Default for StalenessMonitor {
    fn default() -> Self {
        Self::new(STALE_DEADLINE)
    }
}

impl StalenessMonitor {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// True if `job` is `processing` and started more than the deadline ago.
    pub fn is_stale(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if job.status != JobStatus::Processing {
            return false;
        }
        let Some(started_at) = job.started_at else {
            return false;
        };
        // Negative elapsed time (clock skew) never counts as stale.
        match (now - started_at).to_std() {
            Ok(elapsed) => elapsed > self.deadline,
            Err(_) => false,
        }
    }

    /// The transition to apply if `job` is stale.
    pub fn check(&self, job: &Job, now: DateTime<Utc>) -> Option<JobTransition> {
        self.is_stale(job, now).then(JobTransition::timeout)
    }
}
