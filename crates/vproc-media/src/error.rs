//! Error types for media operations.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(PathBuf),

    #[error("FFprobe not found: {0}")]
    FfprobeNotFound(PathBuf),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Source unreachable: {locator}: {reason}")]
    SourceUnreachable { locator: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an unreachable-source error.
    pub fn source_unreachable(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnreachable {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Which side of the pipeline this failure is attributed to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::SourceUnreachable { .. }
            | MediaError::FileNotFound(_)
            | MediaError::InvalidVideo(_) => ErrorCategory::Input,

            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr
                    .as_deref()
                    .and_then(classify_stderr)
                    .unwrap_or(ErrorCategory::Engine)
            }

            MediaError::Io(_) => ErrorCategory::Resource,

            MediaError::FfmpegNotFound(_)
            | MediaError::FfprobeNotFound(_)
            | MediaError::Timeout(_)
            | MediaError::JsonParse(_)
            | MediaError::Internal(_) => ErrorCategory::Engine,
        }
    }
}

/// Map well-known FFmpeg diagnostics to a category.
fn classify_stderr(stderr: &str) -> Option<ErrorCategory> {
    if stderr.contains("No space left on device") {
        Some(ErrorCategory::Resource)
    } else if stderr.contains("Invalid data found") || stderr.contains("moov atom not found") {
        Some(ErrorCategory::Input)
    } else {
        None
    }
}

/// Failure category reported to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Source or overlay unreachable, unreadable or not a video
    Input,
    /// FFmpeg missing, crashed, exited non-zero or timed out
    Engine,
    /// Disk full or scratch/output I/O failure
    Resource,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Engine => "engine",
            ErrorCategory::Resource => "resource",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categorized transcoding failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{category} error: {message}")]
pub struct TranscodeError {
    pub category: ErrorCategory,
    pub message: String,
}

impl TranscodeError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl From<MediaError> for TranscodeError {
    fn from(e: MediaError) -> Self {
        let category = e.category();
        let message = match &e {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => format!("{}: {}", e, last_line(stderr)),
            _ => e.to_string(),
        };
        Self { category, message }
    }
}

fn last_line(s: &str) -> &str {
    s.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
}
