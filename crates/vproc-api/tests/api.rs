//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use vproc_api::{create_router, ApiConfig, AppState};
use vproc_media::{EngineConfig, FfmpegEngine, TranscodeEngine, TranscodeError, TranscodeParams};
use vproc_models::{JobId, JobStatus, JobTransition, PROCESSING_TIMEOUT_MESSAGE};
use vproc_queue::{JobQueue, JobReceiver, QueueConfig};
use vproc_store::{JobStore, MemoryJobStore};
use vproc_worker::Orchestrator;

struct InstantEngine;

#[async_trait]
impl TranscodeEngine for InstantEngine {
    async fn transcode(&self, job_id: &JobId, params: &TranscodeParams) -> Result<String, TranscodeError> {
        Ok(format!("/srv/processed/{}.{}", job_id, params.output_format.extension()))
    }

    async fn discard(&self, _locator: &str) {}
}

struct TestApp {
    router: Router,
    store: Arc<MemoryJobStore>,
    orchestrator: Arc<Orchestrator>,
    _receiver: JobReceiver,
}

fn app_with(engine: Arc<dyn TranscodeEngine>, capacity: usize) -> TestApp {
    let store = Arc::new(MemoryJobStore::new());
    let (queue, receiver) = JobQueue::new(QueueConfig { capacity });
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), engine, queue));
    let router = create_router(AppState::new(ApiConfig::default(), orchestrator.clone()), None);

    TestApp {
        router,
        store,
        orchestrator,
        _receiver: receiver,
    }
}

fn app_with_capacity(capacity: usize) -> TestApp {
    app_with(Arc::new(InstantEngine), capacity)
}

fn app() -> TestApp {
    app_with_capacity(16)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_process_video_accepts_request() {
    let app = app();

    let (status, body) = send(
        &app.router,
        post_json("/process-video", json!({"videoUrl": "https://cdn.example.com/in.mp4"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video processing started");
    assert_eq!(body["status"], "pending");
    let job_id = JobId::from_string(body["jobId"].as_str().unwrap());

    let job = app.store.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.video_path, "https://cdn.example.com/in.mp4");
}

#[tokio::test]
async fn test_process_video_requires_video_url() {
    let app = app();

    let (status, body) = send(&app.router, post_json("/process-video", json!({"options": {}}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Video URL is required"}));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_process_video_rejects_unknown_position() {
    let app = app();

    let (status, body) = send(
        &app.router,
        post_json(
            "/process-video",
            json!({"videoUrl": "in.mp4", "options": {"position": "center"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid option");
    assert!(body["details"].as_str().unwrap().contains("center"));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/process-video")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn test_full_queue_is_server_error() {
    let app = app_with_capacity(1);
    let request = json!({"videoUrl": "in.mp4"});

    let (status, _) = send(&app.router, post_json("/process-video", request.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, post_json("/process-video", request)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to queue processing job");
}

#[tokio::test]
async fn test_job_status_unknown_job() {
    let app = app();

    let (status, body) = send(&app.router, get("/job-status/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Job not found"}));
}

#[tokio::test]
async fn test_job_status_returns_completed_record() {
    let app = app();

    let (_, body) = send(
        &app.router,
        post_json(
            "/process-video",
            json!({"videoUrl": "in.mp4", "options": {"output_format": "webm", "greyscale": true}}),
        ),
    )
    .await;
    let job_id = JobId::from_string(body["jobId"].as_str().unwrap());
    app.orchestrator.run(&job_id).await.unwrap();

    let (status, body) = send(&app.router, get(&format!("/job-status/{}", job_id))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["greyscale"], true);
    assert_eq!(body["output_format"], "webm");
    assert_eq!(body["output_path"], format!("/srv/processed/{}.webm", job_id));
    assert!(body["last_error"].is_null());
}

#[tokio::test]
async fn test_stale_job_times_out_once() {
    let app = app();

    let (_, body) = send(&app.router, post_json("/process-video", json!({"videoUrl": "in.mp4"}))).await;
    let job_id = JobId::from_string(body["jobId"].as_str().unwrap());

    let mut job = app.store.get(&job_id).await.unwrap().unwrap();
    job.apply(
        &JobTransition::start(Utc::now() - chrono::Duration::seconds(301)),
        Utc::now(),
    )
    .unwrap();
    app.store.insert(job).await;

    let uri = format!("/job-status/{}", job_id);
    let (status, body) = send(&app.router, get(&uri)).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body, json!({"error": PROCESSING_TIMEOUT_MESSAGE}));

    let (status, body) = send(&app.router, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["last_error"], PROCESSING_TIMEOUT_MESSAGE);
}

#[tokio::test]
async fn test_recently_started_job_is_not_stale() {
    let app = app();

    let (_, body) = send(&app.router, post_json("/process-video", json!({"videoUrl": "in.mp4"}))).await;
    let job_id = JobId::from_string(body["jobId"].as_str().unwrap());
    app.store
        .apply(&job_id, &JobTransition::start(Utc::now()))
        .await
        .unwrap();

    let (status, body) = send(&app.router, get(&format!("/job-status/{}", job_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");
}

#[tokio::test]
async fn test_missing_ffmpeg_still_serves_and_fails_jobs() {
    let dir = tempfile::TempDir::new().unwrap();
    let video = dir.path().join("in.mp4");
    std::fs::write(&video, b"media").unwrap();

    let engine = FfmpegEngine::new(EngineConfig {
        ffmpeg_path: dir.path().join("no-such-ffmpeg"),
        ffprobe_path: dir.path().join("no-such-ffprobe"),
        work_dir: dir.path().join("work"),
        output_dir: dir.path().join("processed"),
        ..Default::default()
    })
    .unwrap();
    assert!(engine.verify().await.is_err());
    let app = app_with(Arc::new(engine), 16);

    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(
        &app.router,
        post_json("/process-video", json!({"videoUrl": video.to_str().unwrap()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let job_id = JobId::from_string(body["jobId"].as_str().unwrap());
    app.orchestrator.run(&job_id).await.unwrap();

    let (status, body) = send(&app.router, get(&format!("/job-status/{}", job_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["output_path"].is_null());
    assert!(body["last_error"].as_str().unwrap().contains("no-such-ff"));
}

#[tokio::test]
async fn test_production_hides_internal_details() {
    let store = Arc::new(MemoryJobStore::new());
    let (queue, _receiver) = JobQueue::new(QueueConfig::default());
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), Arc::new(InstantEngine), queue));
    let config = ApiConfig {
        environment: "Production".to_string(),
        ..Default::default()
    };
    let router = create_router(AppState::new(config, orchestrator), None);
    store.set_unavailable(true);

    let (status, body) = send(&router, get("/job-status/abc")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch job status"}));

    let (status, body) = send(&router, post_json("/process-video", json!({"videoUrl": "in.mp4"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to create processing job"}));
}

#[tokio::test]
async fn test_job_status_store_failure() {
    let app = app();
    app.store.set_unavailable(true);

    let (status, body) = send(&app.router, get("/job-status/abc")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch job status");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app.router, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    app.store.set_unavailable(true);
    let (status, body) = send(&app.router, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["store"]["status"], "error");
    assert_eq!(body["checks"]["queue"]["status"], "ok");
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let app = app();
    let (status, _) = send(&app.router, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let response = app.router.clone().oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
