//! FFmpeg filter graph for greyscale and logo overlay.

use crate::overlay::OverlayLayout;

/// Luma-preserving desaturation.
pub const FILTER_GREYSCALE: &str = "hue=s=0";

/// Label of the final video stream in a filter graph.
const VIDEO_OUT: &str = "vout";

/// Filter graph plus the video stream to map into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    filter_complex: Option<String>,
    video_map: String,
}

impl FilterGraph {
    /// Build the graph for input 0 (video) and, when `overlay` is set, input 1 (logo).
    ///
    /// Greyscale is applied to the video before the logo is composited, so the
    /// logo keeps its colours.
    pub fn build(greyscale: bool, overlay: Option<&OverlayLayout>) -> Self {
        let mut chains: Vec<String> = Vec::new();

        match (greyscale, overlay) {
            (false, None) => {
                return Self {
                    filter_complex: None,
                    video_map: "0:v:0".to_string(),
                }
            }
            (true, None) => {
                chains.push(format!("[0:v]{}[{}]", FILTER_GREYSCALE, VIDEO_OUT));
            }
            (greyscale, Some(layout)) => {
                let base = if greyscale {
                    chains.push(format!("[0:v]{}[base]", FILTER_GREYSCALE));
                    "base"
                } else {
                    "0:v"
                };

                let logo = match layout.scale_filter() {
                    Some(scale) => {
                        chains.push(format!("[1:v]{}[logo]", scale));
                        "logo"
                    }
                    None => "1:v",
                };

                chains.push(format!(
                    "[{}][{}]{}[{}]",
                    base,
                    logo,
                    layout.overlay_filter(),
                    VIDEO_OUT
                ));
            }
        }

        Self {
            filter_complex: Some(chains.join(";")),
            video_map: format!("[{}]", VIDEO_OUT),
        }
    }

    pub fn filter_complex(&self) -> Option<&str> {
        self.filter_complex.as_deref()
    }

    pub fn video_map(&self) -> &str {
        &self.video_map
    }
}
