use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::frame_source::{FrameSource, SeekableSource};
use crate::video::infrastructure::ffmpeg_decoder::{count_video_packets, FfmpegDecoder};

/// Seekable source over a video file, decoded with ffmpeg.
///
/// Seeking reopens the container and decodes forward to the target, so it
/// is frame accurate regardless of keyframe placement. Containers without a
/// stored frame count are counted once at open.
pub struct FfmpegVideoSource {
    path: PathBuf,
    decoder: Option<FfmpegDecoder>,
    metadata: SourceMetadata,
}

impl FfmpegVideoSource {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let (decoder, mut metadata) = open_decoder(path)?;
        if metadata.total_frames.is_none() {
            let counted = count_video_packets(path)?;
            debug!("{} stores no frame count; counted {counted} packets", path.display());
            metadata.total_frames = Some(counted);
        }
        debug!(
            "Opened {} ({}x{}, {:.2} fps, {} frames, {})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames.unwrap_or(0),
            metadata.codec
        );
        Ok(Self {
            path: path.to_path_buf(),
            decoder: Some(decoder),
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_decoder(path: &Path) -> Result<(FfmpegDecoder, SourceMetadata), VideoError> {
    let label = path.display().to_string();
    ffmpeg_next::init().map_err(|e| VideoError::unavailable(&label, e))?;
    if !path.is_file() {
        return Err(VideoError::unavailable(&label, "file not found"));
    }
    let ictx = ffmpeg_next::format::input(path).map_err(|e| VideoError::unavailable(&label, e))?;
    let (decoder, mut metadata) = FfmpegDecoder::new(ictx, &label, false)?;
    metadata.source_path = Some(path.to_path_buf());
    Ok((decoder, metadata))
}

impl FrameSource for FfmpegVideoSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read_next(&mut self) -> Result<Option<Frame>, VideoError> {
        match self.decoder.as_mut() {
            Some(decoder) => decoder.decode_next(),
            None => Err(VideoError::Closed),
        }
    }

    fn close(&mut self) {
        self.decoder = None;
    }
}

impl SeekableSource for FfmpegVideoSource {
    fn len(&self) -> usize {
        self.metadata.total_frames.unwrap_or(0)
    }

    fn seek(&mut self, index: usize) -> Result<(), VideoError> {
        if self.decoder.is_none() {
            return Err(VideoError::Closed);
        }
        let len = self.len();
        if index > len {
            return Err(VideoError::OutOfRange {
                index,
                start: 0,
                end: len.saturating_sub(1),
            });
        }

        let (mut decoder, _) = open_decoder(&self.path)?;
        let mut skipped = 0;
        while skipped < index {
            match decoder.decode_next() {
                Ok(Some(_)) => skipped += 1,
                Ok(None) => break,
                Err(VideoError::DecodeError { index: bad, reason }) => {
                    warn!("Skipping undecodable frame {bad} while seeking: {reason}");
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        self.decoder = Some(decoder);
        Ok(())
    }
}
