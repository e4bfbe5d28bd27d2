use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use crate::pipeline::playback_logger::PlaybackLogger;
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    /// Indices of frames that could not be decoded.
    pub skipped: Vec<usize>,
    pub cancelled: bool,
}

/// Writes every frame of a sequence to `<dir>/frame_<index>.png`.
pub struct ExportFramesUseCase {
    image_writer: Box<dyn ImageWriter>,
    logger: Box<dyn PlaybackLogger>,
    size: Option<(u32, u32)>,
    cancelled: Arc<AtomicBool>,
}

impl ExportFramesUseCase {
    pub fn new(
        image_writer: Box<dyn ImageWriter>,
        logger: Box<dyn PlaybackLogger>,
        size: Option<(u32, u32)>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            image_writer,
            logger,
            size,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn frame_path(output_dir: &Path, index: usize) -> PathBuf {
        output_dir.join(format!("frame_{index:06}.png"))
    }

    /// Drains `frames`, letterboxing each to the configured size. `total`
    /// is only used for progress reporting.
    ///
    /// Undecodable frames are skipped and listed in the summary; any other
    /// error stops the export.
    pub fn execute<I>(
        &mut self,
        frames: I,
        total: Option<usize>,
        output_dir: &Path,
    ) -> Result<ExportSummary, VideoError>
    where
        I: IntoIterator<Item = Result<Frame, VideoError>>,
    {
        std::fs::create_dir_all(output_dir).map_err(|source| VideoError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let mut summary = ExportSummary::default();
        for result in frames {
            if self.cancelled.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }
            let frame = match result {
                Ok(frame) => frame,
                Err(VideoError::DecodeError { index, reason }) => {
                    warn!("Skipping frame {index}: {reason}");
                    summary.skipped.push(index);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let t0 = Instant::now();
            let path = Self::frame_path(output_dir, frame.index());
            self.image_writer.write(&path, &frame, self.size)?;
            self.logger
                .timing("write", t0.elapsed().as_secs_f64() * 1000.0);

            summary.written += 1;
            self.logger.progress(summary.written, total);
        }

        self.logger.summary();
        info!(
            "Exported {} frames to {}",
            summary.written,
            output_dir.display()
        );
        Ok(summary)
    }
}
