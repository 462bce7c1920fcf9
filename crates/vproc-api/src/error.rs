//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use vproc_models::{ValidationError, PROCESSING_TIMEOUT_MESSAGE};
use vproc_worker::SubmitError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Processing timeout reached")]
    ProcessingTimeout,

    #[error("{context}: {details}")]
    Internal {
        context: &'static str,
        details: String,
        expose_details: bool,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(context: &'static str, details: impl ToString) -> Self {
        Self::Internal {
            context,
            details: details.to_string(),
            expose_details: true,
        }
    }

    /// Keep internal details out of the response body when `hide` is set.
    pub fn hide_details_if(self, hide: bool) -> Self {
        match self {
            ApiError::Internal {
                context,
                details,
                expose_details,
            } => ApiError::Internal {
                context,
                details,
                expose_details: expose_details && !hide,
            },
            other => other,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ProcessingTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Validation(e @ ValidationError::MissingVideo) => ErrorResponse::new(e.to_string()),
            ApiError::Validation(e @ ValidationError::InvalidOption { .. }) => {
                ErrorResponse::new("Invalid option").with_details(e.to_string())
            }
            ApiError::BadRequest(details) => {
                ErrorResponse::new("Invalid request body").with_details(details.clone())
            }
            ApiError::NotFound(what) => ErrorResponse::new(*what),
            ApiError::ProcessingTimeout => ErrorResponse::new(PROCESSING_TIMEOUT_MESSAGE),
            ApiError::Internal {
                context,
                details,
                expose_details: true,
            } => ErrorResponse::new(*context).with_details(details.clone()),
            ApiError::Internal { context, .. } => ErrorResponse::new(*context),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(e) => ApiError::Validation(e),
            SubmitError::Store(e) => ApiError::internal("Failed to create processing job", e),
            SubmitError::Queue { source, .. } => ApiError::internal("Failed to queue processing job", source),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}
