//! FFmpeg CLI wrapper for video transformation jobs.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Source resolution (HTTP download, `file://` URLs, bare paths)
//! - Overlay layout and filter graph construction
//! - The `TranscodeEngine` seam and its FFmpeg implementation

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod overlay;
pub mod probe;
pub mod source;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use config::EngineConfig;
pub use engine::{FfmpegEngine, TranscodeEngine, TranscodeParams};
pub use error::{ErrorCategory, MediaError, MediaResult, TranscodeError};
pub use filters::FilterGraph;
pub use overlay::{FrameSize, OverlayLayout};
pub use probe::{probe_video, VideoInfo};
