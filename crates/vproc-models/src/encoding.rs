//! Per-container encoding profiles.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::OutputFormat;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF for H.264 outputs
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Video encoding settings for one output container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingProfile {
    /// Video codec (e.g., "libx264", "libvpx-vp9")
    pub codec: String,

    /// Encoder preset, only for encoders that take one
    #[serde(default)]
    pub preset: Option<String>,

    /// Constant Rate Factor (lower is better)
    #[serde(default)]
    pub crf: Option<u8>,

    /// Fixed quantizer scale, for encoders without CRF
    #[serde(default)]
    pub qscale: Option<u8>,

    /// Audio codec
    pub audio_codec: String,

    /// Audio bitrate
    pub audio_bitrate: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: Some(DEFAULT_PRESET.to_string()),
            crf: Some(DEFAULT_CRF),
            qscale: None,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            extra_args: vec!["-pix_fmt".to_string(), "yuv420p".to_string()],
        }
    }
}

impl EncodingProfile {
    /// Profile used for a given output container.
    pub fn for_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Mp4 | OutputFormat::Mov => Self::default().with_faststart(),
            OutputFormat::Mkv => Self::default(),
            OutputFormat::Webm => Self {
                codec: "libvpx-vp9".to_string(),
                preset: None,
                crf: Some(32),
                qscale: None,
                audio_codec: "libopus".to_string(),
                audio_bitrate: "96k".to_string(),
                // VP9 only honours CRF in constant-quality mode
                extra_args: vec!["-b:v".to_string(), "0".to_string()],
            },
            OutputFormat::Avi => Self {
                codec: "mpeg4".to_string(),
                preset: None,
                crf: None,
                qscale: Some(5),
                audio_codec: "libmp3lame".to_string(),
                audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
                extra_args: Vec::new(),
            },
        }
    }

    /// Returns a new profile with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Move the moov atom to the front so playback can start before download finishes.
    pub fn with_faststart(mut self) -> Self {
        self.extra_args
            .extend(["-movflags".to_string(), "+faststart".to_string()]);
        self
    }

    /// Convert to FFmpeg command arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.codec.clone()];

        if let Some(preset) = &self.preset {
            args.extend(["-preset".to_string(), preset.clone()]);
        }
        if let Some(crf) = self.crf {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }
        if let Some(q) = self.qscale {
            args.extend(["-q:v".to_string(), q.to_string()]);
        }

        args.extend([
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]);

        args.extend(self.extra_args.iter().cloned());

        args
    }
}
