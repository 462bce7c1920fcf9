//! Transcoding engine seam and its FFmpeg implementation.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vproc_models::{JobId, JobParams};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::config::EngineConfig;
use crate::error::{MediaError, MediaResult, TranscodeError};
use crate::filters::FilterGraph;
use crate::fs_utils::{move_file, remove_quietly};
use crate::overlay::OverlayLayout;
use crate::probe::probe_video;
use crate::source;

/// Parameters of one transformation.
pub type TranscodeParams = JobParams;

/// Metric names for transcoding.
pub mod names {
    pub const TRANSCODE_DURATION: &str = "vproc_transcode_duration_seconds";
}

/// Something that turns a job's parameters into an output file.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Produce the output for `params` and return its locator.
    async fn transcode(&self, job_id: &JobId, params: &TranscodeParams) -> Result<String, TranscodeError>;

    /// Remove an output previously returned by `transcode`.
    async fn discard(&self, locator: &str);
}

/// FFmpeg CLI engine.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    config: EngineConfig,
    runner: FfmpegRunner,
    http: Client,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> MediaResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("vproc-media/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let runner = FfmpegRunner::new(config.ffmpeg_path.clone()).with_timeout(config.ffmpeg_timeout);

        Ok(Self {
            config,
            runner,
            http,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `ffmpeg -version` and log the version line.
    pub async fn verify(&self) -> MediaResult<String> {
        let version = self.runner.version().await?;
        info!(ffmpeg = %self.config.ffmpeg_path.display(), "{}", version);
        Ok(version)
    }

    /// Create the work and output directories.
    pub async fn prepare_dirs(&self) -> MediaResult<()> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        Ok(())
    }

    async fn run_pipeline(&self, job_id: &JobId, params: &TranscodeParams) -> MediaResult<String> {
        self.prepare_dirs().await?;

        // Dropped on every exit path, taking downloads and partial output with it.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("vproc-{}-", job_id))
            .tempdir_in(&self.config.work_dir)?;

        let video = source::resolve(&self.http, &params.video_path, scratch.path(), "source").await?;
        let info = probe_video(&self.config.ffprobe_path, &video).await?;
        debug!(
            job_id = %job_id,
            width = info.width,
            height = info.height,
            codec = %info.codec,
            duration = info.duration,
            has_audio = info.has_audio,
            "Probed source"
        );

        let overlay = if params.has_logo() {
            let logo = source::resolve(&self.http, &params.logo_path, scratch.path(), "logo").await?;
            let logo_info = probe_video(&self.config.ffprobe_path, &logo).await?;
            let layout = OverlayLayout::compute(
                info.frame_size(),
                logo_info.frame_size(),
                params.position,
                self.config.overlay_margin,
                self.config.max_logo_fraction,
            );
            Some((logo, layout))
        } else {
            None
        };

        let graph = FilterGraph::build(params.greyscale, overlay.as_ref().map(|(_, layout)| layout));

        let file_name = format!(
            "{}-{}.{}",
            job_id,
            Uuid::new_v4(),
            params.output_format.extension()
        );
        let partial = scratch.path().join(&file_name);

        let mut cmd = FfmpegCommand::new(&partial).input(&video);
        if let Some((logo, _)) = &overlay {
            cmd = cmd.input(logo);
        }
        let cmd = cmd
            .filter_graph(&graph)
            .output_args(params.output_format.encoding_profile().to_ffmpeg_args());

        self.runner.run(&cmd).await?;

        let published = self.config.output_dir.join(&file_name);
        move_file(&partial, &published).await?;

        Ok(self.config.output_locator(&file_name, &published))
    }

    /// Map a locator back to a file inside `output_dir`.
    fn output_path_for(&self, locator: &str) -> Option<PathBuf> {
        let file_name = match &self.config.public_base_url {
            Some(base) => locator.strip_prefix(base.trim_end_matches('/'))?.trim_start_matches('/'),
            None => Path::new(locator).file_name()?.to_str()?,
        };

        if file_name.is_empty() || file_name.contains('/') || file_name.contains("..") {
            return None;
        }
        Some(self.config.output_dir.join(file_name))
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn transcode(&self, job_id: &JobId, params: &TranscodeParams) -> Result<String, TranscodeError> {
        let start = Instant::now();
        let result = self.run_pipeline(job_id, params).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::histogram!(
            names::TRANSCODE_DURATION,
            "format" => params.output_format.as_str(),
            "outcome" => outcome
        )
        .record(start.elapsed().as_secs_f64());

        result.map_err(|e| {
            let err = TranscodeError::from(e);
            warn!(job_id = %job_id, category = %err.category, "Transcode failed: {}", err.message);
            err
        })
    }

    async fn discard(&self, locator: &str) {
        match self.output_path_for(locator) {
            Some(path) => remove_quietly(path).await,
            None => warn!(locator, "Refusing to discard output outside the output directory"),
        }
    }
}
