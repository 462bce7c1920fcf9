//! Job record and lifecycle transitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::{JobParams, OutputFormat, Position};

/// Error message recorded when a job is relabeled after exceeding the processing deadline.
pub const PROCESSING_TIMEOUT_MESSAGE: &str = "Processing timeout reached";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is created and waiting for a worker
    #[default]
    Pending,
    /// Job is actively being transcoded
    Processing,
    /// Job finished and has an output
    Completed,
    /// Job failed or timed out
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether `self -> next` moves forward along
    /// `pending -> processing -> {completed | error}`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Error)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single video transformation job.
///
/// Field names match the `processing_jobs` table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID, assigned by the store
    pub id: JobId,

    /// Source video locator (URL or path)
    pub video_path: String,

    /// Overlay image locator, empty when no overlay is requested
    #[serde(default)]
    pub logo_path: String,

    /// Corner the overlay is placed at
    #[serde(default)]
    pub position: Position,

    /// Convert to greyscale before overlaying
    #[serde(default)]
    pub greyscale: bool,

    /// Target container/codec
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Current lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Set once, when the job starts processing
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    /// Failure description, only in `error`
    #[serde(default)]
    pub last_error: Option<String>,

    /// Result locator, only in `completed`
    #[serde(default)]
    pub output_path: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job from validated parameters.
    pub fn new(id: JobId, params: JobParams, now: DateTime<Utc>) -> Self {
        Self {
            id,
            video_path: params.video_path,
            logo_path: params.logo_path,
            position: params.position,
            greyscale: params.greyscale,
            output_format: params.output_format,
            status: JobStatus::Pending,
            started_at: None,
            last_error: None,
            output_path: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Parameters handed to the transcoding engine.
    pub fn params(&self) -> JobParams {
        JobParams {
            video_path: self.video_path.clone(),
            logo_path: self.logo_path.clone(),
            position: self.position,
            greyscale: self.greyscale,
            output_format: self.output_format,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `output_path` iff completed, `last_error` iff error.
    pub fn invariants_hold(&self) -> bool {
        let output_ok = self.output_path.is_some() == (self.status == JobStatus::Completed);
        let error_ok = self.last_error.is_some() == (self.status == JobStatus::Error);
        let started_ok = self.status != JobStatus::Processing || self.started_at.is_some();
        output_ok && error_ok && started_ok
    }

    /// Apply a transition in memory.
    ///
    /// Fails without touching the record when the job is not in the
    /// transition's source status.
    pub fn apply(&mut self, transition: &JobTransition, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != transition.from {
            return Err(TransitionError {
                job_id: self.id.clone(),
                expected: transition.from,
                actual: self.status,
            });
        }

        self.status = transition.to;
        if let Some(started_at) = transition.started_at {
            // started_at is written once and never cleared
            self.started_at.get_or_insert(started_at);
        }
        self.output_path = transition.output_path.clone();
        self.last_error = transition.last_error.clone();
        self.updated_at = Some(now);
        Ok(())
    }
}

/// A job was not in the status a transition expected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("job {job_id} is {actual}, expected {expected}")]
pub struct TransitionError {
    pub job_id: JobId,
    pub expected: JobStatus,
    pub actual: JobStatus,
}

/// One forward step in a job's lifecycle and the fields it sets.
///
/// Only constructible through the named constructors, so every transition
/// keeps `output_path`/`last_error` consistent with its target status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTransition {
    from: JobStatus,
    to: JobStatus,
    started_at: Option<DateTime<Utc>>,
    output_path: Option<String>,
    last_error: Option<String>,
}

impl JobTransition {
    /// `pending -> processing`, stamping `started_at`.
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            from: JobStatus::Pending,
            to: JobStatus::Processing,
            started_at: Some(now),
            output_path: None,
            last_error: None,
        }
    }

    /// `processing -> completed` with the produced output.
    pub fn complete(output_path: impl Into<String>) -> Self {
        Self {
            from: JobStatus::Processing,
            to: JobStatus::Completed,
            started_at: None,
            output_path: Some(output_path.into()),
            last_error: None,
        }
    }

    /// `processing -> error` with a failure description.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            from: JobStatus::Processing,
            to: JobStatus::Error,
            started_at: None,
            output_path: None,
            last_error: Some(message.into()),
        }
    }

    /// `processing -> error` for a job that exceeded the processing deadline.
    pub fn timeout() -> Self {
        Self::fail(PROCESSING_TIMEOUT_MESSAGE)
    }

    /// `pending -> error` for a job that could never be handed to a worker.
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            from: JobStatus::Pending,
            to: JobStatus::Error,
            started_at: None,
            output_path: None,
            last_error: Some(message.into()),
        }
    }

    pub fn from(&self) -> JobStatus {
        self.from
    }

    pub fn to(&self) -> JobStatus {
        self.to
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_job() -> Job {
        Job::new(
            JobId::new(),
            JobParams::new("https://cdn.example.com/in.mp4"),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = pending_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert!(job.invariants_hold());
    }

    #[test]
    fn test_status_transitions_are_forward_only() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Error.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn test_every_constructor_is_a_legal_transition() {
        for t in [
            JobTransition::start(Utc::now()),
            JobTransition::complete("/out/a.mp4"),
            JobTransition::fail("boom"),
            JobTransition::timeout(),
            JobTransition::reject("queue closed"),
        ] {
            assert!(t.from().can_transition_to(t.to()), "{:?}", t);
        }
    }

    #[test]
    fn test_full_lifecycle_keeps_invariants() {
        let mut job = pending_job();
        let started = Utc::now();

        job.apply(&JobTransition::start(started), Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.started_at, Some(started));
        assert!(job.invariants_hold());

        job.apply(&JobTransition::complete("/out/a.mp4"), Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.output_path.as_deref(), Some("/out/a.mp4"));
        assert_eq!(job.started_at, Some(started));
        assert!(job.invariants_hold());
    }

    #[test]
    fn test_terminal_job_rejects_further_transitions() {
        let mut job = pending_job();
        job.apply(&JobTransition::start(Utc::now()), Utc::now()).unwrap();
        job.apply(&JobTransition::timeout(), Utc::now()).unwrap();
        let snapshot = job.clone();

        let err = job
            .apply(&JobTransition::complete("/out/late.mp4"), Utc::now())
            .unwrap_err();
        assert_eq!(err.expected, JobStatus::Processing);
        assert_eq!(err.actual, JobStatus::Error);
        assert_eq!(job, snapshot);
        assert_eq!(job.last_error.as_deref(), Some(PROCESSING_TIMEOUT_MESSAGE));
    }

    #[test]
    fn test_reject_skips_processing() {
        let mut job = pending_job();
        job.apply(&JobTransition::reject("queue full"), Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.started_at.is_none());
        assert!(job.invariants_hold());
    }

    #[test]
    fn test_job_serializes_with_table_columns() {
        let job = pending_job();
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["position"], "top-left");
        assert_eq!(json["output_format"], "mp4");
        assert_eq!(json["greyscale"], false);
        assert!(json["started_at"].is_null());
        assert!(json["output_path"].is_null());
    }

    #[test]
    fn test_job_schema_lists_status_values() {
        let schema = serde_json::to_value(schemars::schema_for!(Job)).unwrap();
        assert!(schema["properties"]["status"].is_object());

        let status = serde_json::to_string(&schemars::schema_for!(JobStatus)).unwrap();
        for value in ["pending", "processing", "completed", "error"] {
            assert!(status.contains(&format!("\"{}\"", value)), "{}", value);
        }
    }
}
