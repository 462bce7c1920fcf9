//! Shared data models for the video processor.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their status and lifecycle transitions
//! - Overlay position and output format options
//! - Request validation for new transformation jobs
//! - Per-format encoding profiles

pub mod encoding;
pub mod job;
pub mod options;
pub mod request;

// Re-export common types
pub use encoding::EncodingProfile;
pub use job::{
    Job, JobId, JobStatus, JobTransition, TransitionError, PROCESSING_TIMEOUT_MESSAGE,
};
pub use options::{OptionParseError, OutputFormat, Position};
pub use request::{JobParams, ProcessVideoRequest, ProcessingOptions, ValidationError};
