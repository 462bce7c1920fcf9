//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{get_job_status, health, process_video, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, make_request_span, propagate_request_id_layer, request_logging, set_request_id_layer,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        .route("/process-video", post(process_video))
        .route("/job-status/:jobId", get(get_job_status));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(job_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
