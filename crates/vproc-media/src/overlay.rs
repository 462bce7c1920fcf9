//! Logo placement.
//!
//! The logo keeps its native size unless it does not fit the frame, in which
//! case it is shrunk to a fraction of the frame width. It is anchored to one
//! corner with a fixed margin.

use serde::{Deserialize, Serialize};
use vproc_models::Position;

/// Default gap between the logo and the frame edges, in pixels.
pub const DEFAULT_MARGIN: u32 = 20;

/// Default logo width as a fraction of frame width, used only when shrinking.
pub const DEFAULT_MAX_LOGO_FRACTION: f64 = 0.25;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn fits_in(&self, other: &FrameSize) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

/// Where and how big the logo is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLayout {
    /// Left edge of the logo in frame coordinates
    pub x: u32,
    /// Top edge of the logo in frame coordinates
    pub y: u32,
    /// Rendered logo width
    pub width: u32,
    /// Rendered logo height
    pub height: u32,
    /// Whether the logo must be rescaled before overlaying
    pub scaled: bool,
}

impl OverlayLayout {
    pub fn compute(
        frame: FrameSize,
        logo: FrameSize,
        position: Position,
        margin: u32,
        max_logo_fraction: f64,
    ) -> Self {
        let (width, height, scaled) = if logo.fits_in(&frame) {
            (logo.width, logo.height, false)
        } else {
            let (w, h) = shrink(frame, logo, max_logo_fraction);
            (w, h, true)
        };

        let x = if position.is_right() {
            frame.width.saturating_sub(width.saturating_add(margin))
        } else {
            margin
        };
        let y = if position.is_bottom() {
            frame.height.saturating_sub(height.saturating_add(margin))
        } else {
            margin
        };

        Self {
            x,
            y,
            width,
            height,
            scaled,
        }
    }

    /// `scale` filter for the logo, when it needs one.
    pub fn scale_filter(&self) -> Option<String> {
        self.scaled
            .then(|| format!("scale={}:{}", self.width, self.height))
    }

    /// `overlay` filter placing the logo.
    pub fn overlay_filter(&self) -> String {
        format!("overlay={}:{}:format=auto", self.x, self.y)
    }
}

/// Shrink `logo` to `fraction` of the frame width, then to the frame height
/// if still too tall. Aspect ratio is preserved and dimensions are even.
fn shrink(frame: FrameSize, logo: FrameSize, fraction: f64) -> (u32, u32) {
    let logo_w = u64::from(logo.width.max(1));
    let logo_h = u64::from(logo.height.max(1));

    let mut w = ((f64::from(frame.width) * fraction).floor() as u64).max(2);
    let mut h = logo_h * w / logo_w;

    if h > u64::from(frame.height) {
        h = u64::from(frame.height);
        w = logo_w * h / logo_h;
    }

    (even(w), even(h))
}

fn even(v: u64) -> u32 {
    let v = u32::try_from(v).unwrap_or(u32::MAX);
    (v - v % 2).max(2)
}
