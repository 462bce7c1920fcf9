//! Video processing submission and job status handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use vproc_models::{Job, JobId, JobStatus, ProcessVideoRequest};
use vproc_worker::StatusRead;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response to an accepted submission.
#[derive(Debug, Serialize)]
pub struct ProcessVideoResponse {
    pub message: String,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Accept a processing request and queue it.
///
/// POST /process-video
pub async fn process_video(
    State(state): State<AppState>,
    payload: Result<Json<ProcessVideoRequest>, JsonRejection>,
) -> ApiResult<Json<ProcessVideoResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let outcome = state
        .orchestrator
        .submit(&request)
        .await
        .map_err(|e| ApiError::from(e).hide_details_if(state.config.is_production()))?;
    info!(job_id = %outcome.job.id, "Video processing started");

    Ok(Json(ProcessVideoResponse {
        message: "Video processing started".to_string(),
        job_id: outcome.job.id,
        status: outcome.job.status,
    }))
}

/// Current state of a job.
///
/// GET /job-status/:jobId
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job_id = JobId::from_string(job_id);

    match state.orchestrator.status(&job_id).await {
        Ok(StatusRead::Found(job)) => Ok(Json(job)),
        Ok(StatusRead::TimedOut(_)) => Err(ApiError::ProcessingTimeout),
        Ok(StatusRead::NotFound) => Err(ApiError::NotFound("Job not found")),
        Err(e) => Err(ApiError::internal("Failed to fetch job status", e)
            .hide_details_if(state.config.is_production())),
    }
}
