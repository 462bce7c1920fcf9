//! Test doubles.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use vproc_media::{TranscodeEngine, TranscodeError, TranscodeParams};
use vproc_models::JobId;

/// Engine returning a canned result, optionally held until released.
#[derive(Default)]
pub struct FakeEngine {
    failure: Option<TranscodeError>,
    gate: Option<Arc<Notify>>,
    pub calls: Mutex<Vec<JobId>>,
    pub discarded: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(error: TranscodeError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    /// Block every transcode until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    /// Fail with `error` once released.
    pub fn gated_failing(gate: Arc<Notify>, error: TranscodeError) -> Self {
        Self {
            failure: Some(error),
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn output_for(job_id: &JobId) -> String {
        format!("/srv/processed/{}.mp4", job_id)
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn transcode(&self, job_id: &JobId, _params: &TranscodeParams) -> Result<String, TranscodeError> {
        self.calls.lock().unwrap().push(job_id.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Self::output_for(job_id)),
        }
    }

    async fn discard(&self, locator: &str) {
        self.discarded.lock().unwrap().push(locator.to_string());
    }
}
