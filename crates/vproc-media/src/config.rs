//! Transcoding engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::overlay::{DEFAULT_MARGIN, DEFAULT_MAX_LOGO_FRACTION};

/// FFmpeg location used in production images.
pub const PRODUCTION_FFMPEG_PATH: &str = "/usr/bin/ffmpeg";
/// FFprobe location used in production images.
pub const PRODUCTION_FFPROBE_PATH: &str = "/usr/bin/ffprobe";

/// Engine configuration, passed explicitly to [`crate::FfmpegEngine::new`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// FFmpeg binary (absolute path or name looked up in `PATH`)
    pub ffmpeg_path: PathBuf,
    /// FFprobe binary
    pub ffprobe_path: PathBuf,
    /// Parent of per-job scratch directories
    pub work_dir: PathBuf,
    /// Where finished outputs are published
    pub output_dir: PathBuf,
    /// Gap between logo and frame edges, in pixels
    pub overlay_margin: u32,
    /// Logo width as a fraction of frame width when the logo must shrink
    pub max_logo_fraction: f64,
    /// Kill FFmpeg after this long
    pub ffmpeg_timeout: Option<Duration>,
    /// Public URL prefix for `output_dir`; the filesystem path is returned when unset
    pub public_base_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            work_dir: std::env::temp_dir().join("vproc"),
            output_dir: PathBuf::from("processed"),
            overlay_margin: DEFAULT_MARGIN,
            max_logo_fraction: DEFAULT_MAX_LOGO_FRACTION,
            ffmpeg_timeout: None,
            public_base_url: None,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let production = std::env::var("ENVIRONMENT")
            .map(|e| e.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let defaults = Self::default();

        let binary = |var: &str, production_path: &str, fallback: PathBuf| {
            match std::env::var(var).ok().filter(|s| !s.is_empty()) {
                Some(path) => PathBuf::from(path),
                None if production => PathBuf::from(production_path),
                None => fallback,
            }
        };

        Self {
            ffmpeg_path: binary("FFMPEG_PATH", PRODUCTION_FFMPEG_PATH, defaults.ffmpeg_path),
            ffprobe_path: binary("FFPROBE_PATH", PRODUCTION_FFPROBE_PATH, defaults.ffprobe_path),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            overlay_margin: std::env::var("OVERLAY_MARGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.overlay_margin),
            max_logo_fraction: std::env::var("MAX_LOGO_FRACTION")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|f| *f > 0.0 && *f <= 1.0)
                .unwrap_or(defaults.max_logo_fraction),
            ffmpeg_timeout: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// Locator returned for a published output file.
    pub fn output_locator(&self, file_name: &str, path: &Path) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), file_name),
            None => path.display().to_string(),
        }
    }
}
