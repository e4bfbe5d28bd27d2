use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::shared::constants::DEFAULT_SAVE_FPS;
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Encodes RGB frames as MPEG-4 through ffmpeg-next.
///
/// The container is picked from the output file extension (`.mp4`, `.mkv`,
/// `.avi`, ...). Frame rates are rounded to whole frames per second.
pub struct FfmpegVideoWriter {
    session: Option<EncodingSession>,
}

struct EncodingSession {
    path: PathBuf,
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    frame_rate: i32,
    frames_written: usize,
}

// Safety: a writer is owned by one use case and driven from one thread at a
// time. The raw ffmpeg pointers are never shared.
unsafe impl Send for FfmpegVideoWriter {}

impl FfmpegVideoWriter {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }
}

impl Default for FfmpegVideoWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegVideoWriter {
    fn open(&mut self, path: &Path, metadata: &SourceMetadata) -> Result<(), VideoError> {
        if self.session.is_some() {
            return Err(VideoError::InvalidArgument(
                "video writer is already open".into(),
            ));
        }
        if metadata.width == 0 || metadata.height == 0 {
            return Err(VideoError::InvalidArgument(format!(
                "cannot encode {}x{} frames",
                metadata.width, metadata.height
            )));
        }
        self.session = Some(EncodingSession::start(path, metadata)?);
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), VideoError> {
        self.session
            .as_mut()
            .ok_or_else(|| VideoError::InvalidArgument("video writer is not open".into()))?
            .write(frame)
    }

    fn close(&mut self) -> Result<(), VideoError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let path = session.path.clone();
        let written = session.finish()?;
        debug!("Wrote {written} frames to {}", path.display());
        Ok(())
    }
}

impl Drop for FfmpegVideoWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to finalise video: {e}");
        }
    }
}

impl EncodingSession {
    fn start(path: &Path, metadata: &SourceMetadata) -> Result<Self, VideoError> {
        let fail = |e: &dyn std::fmt::Display| VideoError::encode(path, e);
        ffmpeg_next::init().map_err(|e| fail(&e))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| VideoError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut octx = ffmpeg_next::format::output(path).map_err(|e| fail(&e))?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or_else(|| fail(&"MPEG-4 encoder not found"))?;
        let mut ost = octx.add_stream(Some(codec)).map_err(|e| fail(&e))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| fail(&e))?;
        let frame_rate = whole_frame_rate(metadata.fps);
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, frame_rate));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(frame_rate, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .map_err(|e| fail(&e))?;
        ost.set_parameters(&encoder);
        octx.write_header().map_err(|e| fail(&e))?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| fail(&e))?;

        debug!(
            "Encoding {} at {}x{}, {frame_rate} fps",
            path.display(),
            metadata.width,
            metadata.height
        );
        Ok(Self {
            path: path.to_path_buf(),
            octx,
            encoder,
            scaler,
            width: metadata.width,
            height: metadata.height,
            frame_rate,
            frames_written: 0,
        })
    }

    fn write(&mut self, frame: &Frame) -> Result<(), VideoError> {
        if frame.size() != (self.width, self.height) {
            return Err(VideoError::InvalidArgument(format!(
                "frame {} is {}x{}, the video is {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let converted;
        let rgb = if frame.channels() == 3 {
            frame
        } else {
            converted = frame.to_rgb()?;
            &converted
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );
        let stride = rgb_frame.stride(0);
        let row_len = self.width as usize * 3;
        let data = rgb_frame.data_mut(0);
        for (row, src) in rgb.data().chunks_exact(row_len).enumerate() {
            let start = row * stride;
            data[start..start + row_len].copy_from_slice(src);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(&rgb_frame, &mut yuv_frame)
            .map_err(|e| VideoError::encode(&self.path, e))?;
        yuv_frame.set_pts(Some(self.frames_written as i64));
        self.encoder
            .send_frame(&yuv_frame)
            .map_err(|e| VideoError::encode(&self.path, e))?;
        self.drain()?;
        self.frames_written += 1;
        Ok(())
    }

    /// Moves every packet the encoder has ready into the container.
    fn drain(&mut self) -> Result<(), VideoError> {
        let stream_time_base = self
            .octx
            .stream(0)
            .map(|stream| stream.time_base())
            .ok_or_else(|| VideoError::encode(&self.path, "output stream missing"))?;
        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.frame_rate), stream_time_base);
            encoded
                .write_interleaved(&mut self.octx)
                .map_err(|e| VideoError::encode(&self.path, e))?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<usize, VideoError> {
        self.encoder
            .send_eof()
            .map_err(|e| VideoError::encode(&self.path, e))?;
        self.drain()?;
        self.octx
            .write_trailer()
            .map_err(|e| VideoError::encode(&self.path, e))?;
        Ok(self.frames_written)
    }
}

fn whole_frame_rate(fps: f64) -> i32 {
    let rounded = fps.round();
    if rounded >= 1.0 && rounded <= f64::from(i32::MAX) {
        rounded as i32
    } else {
        DEFAULT_SAVE_FPS
    }
}
