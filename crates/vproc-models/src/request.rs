//! Transformation request payloads and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{OutputFormat, Position};

/// Body of a video processing request.
///
/// Every field is optional at the wire level so that a missing video URL
/// surfaces as a [`ValidationError`] instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessVideoRequest {
    #[serde(rename = "videoUrl", default)]
    pub video_url: Option<String>,

    #[serde(default)]
    pub options: Option<ProcessingOptions>,
}

/// Optional transformation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingOptions {
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub greyscale: Option<bool>,
    #[serde(default)]
    pub output_format: Option<String>,
}

/// Validated transformation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    pub video_path: String,
    pub logo_path: String,
    pub position: Position,
    pub greyscale: bool,
    pub output_format: OutputFormat,
}

impl JobParams {
    /// Parameters for a plain re-encode with all defaults.
    pub fn new(video_path: impl Into<String>) -> Self {
        Self {
            video_path: video_path.into(),
            logo_path: String::new(),
            position: Position::default(),
            greyscale: false,
            output_format: OutputFormat::default(),
        }
    }

    pub fn with_logo(mut self, logo_path: impl Into<String>, position: Position) -> Self {
        self.logo_path = logo_path.into();
        self.position = position;
        self
    }

    pub fn with_greyscale(mut self, greyscale: bool) -> Self {
        self.greyscale = greyscale;
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn has_logo(&self) -> bool {
        !self.logo_path.is_empty()
    }
}

/// The request is malformed. Never mutates or creates a job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Video URL is required")]
    MissingVideo,

    #[error("Invalid option {field}: {value}")]
    InvalidOption { field: &'static str, value: String },
}

impl ProcessVideoRequest {
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: Some(video_url.into()),
            options: None,
        }
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Validate the request and fill defaults for absent options.
    ///
    /// Supplied values outside their enumeration are rejected, never
    /// replaced by defaults.
    pub fn validate(&self) -> Result<JobParams, ValidationError> {
        let video_path = self
            .video_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingVideo)?;

        let options = self.options.clone().unwrap_or_default();

        let position = match options.position.as_deref() {
            Some(p) => p.parse::<Position>().map_err(|e| ValidationError::InvalidOption {
                field: e.field,
                value: e.value,
            })?,
            None => Position::default(),
        };

        let output_format = match options.output_format.as_deref() {
            Some(f) => f.parse::<OutputFormat>().map_err(|e| ValidationError::InvalidOption {
                field: e.field,
                value: e.value,
            })?,
            None => OutputFormat::default(),
        };

        Ok(JobParams {
            video_path: video_path.to_string(),
            logo_path: options.logo_path.unwrap_or_default().trim().to_string(),
            position,
            greyscale: options.greyscale.unwrap_or(false),
            output_format,
        })
    }
}
