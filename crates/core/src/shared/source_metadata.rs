use std::path::PathBuf;

use serde::Serialize;

/// Static description of a frame source, captured when it is opened.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceMetadata {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0 for still-image sources.
    pub fps: f64,
    /// `None` for live sources whose length is unknown.
    pub total_frames: Option<usize>,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl SourceMetadata {
    pub fn is_finite(&self) -> bool {
        self.total_frames.is_some()
    }

    /// Nominal duration of one frame, if the source has a frame rate.
    pub fn frame_interval(&self) -> Option<std::time::Duration> {
        (self.fps > 0.0).then(|| std::time::Duration::from_secs_f64(1.0 / self.fps))
    }
}
