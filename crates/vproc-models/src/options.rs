//! Overlay position and output format definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::EncodingProfile;

/// Frame corner the logo is composited at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub const ALL: &'static [Position] = &[
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
        }
    }

    /// Whether the overlay hugs the right edge of the frame.
    pub fn is_right(&self) -> bool {
        matches!(self, Position::TopRight | Position::BottomRight)
    }

    /// Whether the overlay hugs the bottom edge of the frame.
    pub fn is_bottom(&self) -> bool {
        matches!(self, Position::BottomLeft | Position::BottomRight)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Position {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top-left" => Ok(Position::TopLeft),
            "top-right" => Ok(Position::TopRight),
            "bottom-left" => Ok(Position::BottomLeft),
            "bottom-right" => Ok(Position::BottomRight),
            _ => Err(OptionParseError::new("position", s)),
        }
    }
}

/// Target container for the re-encoded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Mov,
    Mkv,
    Avi,
}

impl OutputFormat {
    pub const ALL: &'static [OutputFormat] = &[
        OutputFormat::Mp4,
        OutputFormat::Webm,
        OutputFormat::Mov,
        OutputFormat::Mkv,
        OutputFormat::Avi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Mov => "mov",
            OutputFormat::Mkv => "mkv",
            OutputFormat::Avi => "avi",
        }
    }

    /// File extension for the container.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Default encoding settings for this container.
    pub fn encoding_profile(&self) -> EncodingProfile {
        EncodingProfile::for_format(*self)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "webm" => Ok(OutputFormat::Webm),
            "mov" => Ok(OutputFormat::Mov),
            "mkv" => Ok(OutputFormat::Mkv),
            "avi" => Ok(OutputFormat::Avi),
            _ => Err(OptionParseError::new("output_format", s)),
        }
    }
}

/// A request option was outside its enumeration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {field}: {value}")]
pub struct OptionParseError {
    pub field: &'static str,
    pub value: String,
}

impl OptionParseError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}
