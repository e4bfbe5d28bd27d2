use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use crate::pipeline::export_frames_use_case::ExportSummary;
use crate::pipeline::playback_logger::{NullPlaybackLogger, PlaybackLogger};
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::video::Video;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_video_writer::FfmpegVideoWriter;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveOptions {
    /// Output frame size. Frames of another size are letterboxed into it.
    /// Defaults to the source size.
    pub size: Option<(u32, u32)>,
    /// Output frame rate. Defaults to the source rate.
    pub fps: Option<f64>,
}

/// Encodes every frame of a sequence into one movie file.
pub struct SaveVideoUseCase {
    video_writer: Box<dyn VideoWriter>,
    logger: Box<dyn PlaybackLogger>,
    options: SaveOptions,
    cancelled: Arc<AtomicBool>,
}

impl SaveVideoUseCase {
    pub fn new(
        video_writer: Box<dyn VideoWriter>,
        logger: Box<dyn PlaybackLogger>,
        options: SaveOptions,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            video_writer,
            logger,
            options,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    /// Drains `frames` into `output`. `source` supplies the default size and
    /// frame rate; `total` is only used for progress reporting.
    ///
    /// Undecodable frames are skipped and listed in the summary. The file
    /// is finalised even when a later frame fails.
    pub fn execute<I>(
        &mut self,
        frames: I,
        total: Option<usize>,
        source: &SourceMetadata,
        output: &Path,
    ) -> Result<ExportSummary, VideoError>
    where
        I: IntoIterator<Item = Result<Frame, VideoError>>,
    {
        let (width, height) = self.options.size.unwrap_or((source.width, source.height));
        let metadata = SourceMetadata {
            width,
            height,
            fps: self.options.fps.unwrap_or(source.fps),
            total_frames: None,
            codec: String::new(),
            source_path: Some(output.to_path_buf()),
        };
        self.video_writer.open(output, &metadata)?;

        let mut summary = ExportSummary::default();
        let written = self.write_all(frames, total, (width, height), &mut summary);
        let closed = self.video_writer.close();
        written?;
        closed?;

        self.logger.summary();
        info!("Saved {} frames to {}", summary.written, output.display());
        Ok(summary)
    }

    fn write_all<I>(
        &mut self,
        frames: I,
        total: Option<usize>,
        size: (u32, u32),
        summary: &mut ExportSummary,
    ) -> Result<(), VideoError>
    where
        I: IntoIterator<Item = Result<Frame, VideoError>>,
    {
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
            let frame = frame.letterboxed(size.0, size.1)?;
            self.video_writer.write(&frame)?;
            self.logger
                .timing("encode", t0.elapsed().as_secs_f64() * 1000.0);

            summary.written += 1;
            self.logger.progress(summary.written, total);
        }
        Ok(())
    }
}

impl Video {
    /// Writes the whole video to a movie file with ffmpeg, rewinding before
    /// and after. Live videos never end and fail with `NotSeekable`.
    pub fn save(&mut self, output: &Path, options: SaveOptions) -> Result<ExportSummary, VideoError> {
        if !self.is_seekable() {
            return Err(VideoError::NotSeekable);
        }
        self.reset()?;
        let metadata = self.metadata().clone();
        let total = self.len();
        let summary = SaveVideoUseCase::new(
            Box::new(FfmpegVideoWriter::new()),
            Box::new(NullPlaybackLogger),
            options,
            None,
        )
        .execute(&mut *self, total, &metadata, output)?;
        self.reset()?;
        Ok(summary)
    }
}
