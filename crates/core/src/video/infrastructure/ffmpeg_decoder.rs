use std::path::Path;
use std::time::Duration;

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

type Input = ffmpeg_next::format::context::Input;

/// Decodes the best video stream of an opened ffmpeg input to RGB frames,
/// one at a time.
///
/// Shared by the file and live sources; owns the demuxer so it can outlive
/// any borrow of the source that created it.
pub(crate) struct FfmpegDecoder {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: ffmpeg_next::Rational,
    width: u32,
    height: u32,
    next_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: a decoder is owned by exactly one source and only driven from the
// thread currently holding that source. The raw ffmpeg pointers are never
// shared.
unsafe impl Send for FfmpegDecoder {}

impl FfmpegDecoder {
    /// Prepares a decoder for `ictx` and describes its video stream.
    ///
    /// `live` sources report no frame count. Files whose container does not
    /// store one report `None` too; see [`count_video_packets`].
    pub(crate) fn new(
        ictx: Input,
        label: &str,
        live: bool,
    ) -> Result<(Self, SourceMetadata), VideoError> {
        let unavailable = |e: &dyn std::fmt::Display| VideoError::unavailable(label, e);

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| unavailable(&"no video stream found"))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| unavailable(&e))?;
        let decoder = codec_ctx.decoder().video().map_err(|e| unavailable(&e))?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| unavailable(&e))?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let total_frames = if live {
            None
        } else {
            container_frame_count(stream.frames())
        };

        let metadata = SourceMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(label.into()),
        };

        Ok((
            Self {
                ictx,
                decoder,
                scaler,
                stream_index,
                time_base,
                width,
                height,
                next_index: 0,
                flushing: false,
                done: false,
            },
            metadata,
        ))
    }

    /// Decodes the next frame, `Ok(None)` once the stream is drained.
    pub(crate) fn decode_next(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.done {
            return Ok(None);
        }

        if let Some(result) = self.try_receive() {
            return result.map(Some);
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return result.map(Some);
                }
                self.done = true;
                return Ok(None);
            };

            if stream.index() != self.stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                let index = self.next_index;
                self.next_index += 1;
                return Err(VideoError::decode(index, e));
            }

            if let Some(result) = self.try_receive() {
                return result.map(Some);
            }
        }
    }

    fn try_receive(&mut self) -> Option<Result<Frame, VideoError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(VideoError::decode(index, e)));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let mut frame = Frame::new(pixels, self.width, self.height, 3, index);
        if let Some(ts) = decoded.timestamp().or_else(|| decoded.pts()) {
            if let Some(timestamp) = to_duration(ts, self.time_base) {
                frame = frame.with_timestamp(timestamp);
            }
        }
        Some(Ok(frame))
    }
}

/// The frame count stored in the container, if any.
fn container_frame_count(stream_frames: i64) -> Option<usize> {
    (stream_frames > 0).then_some(stream_frames as usize)
}

/// Counts the packets of the best video stream in `path` without decoding.
///
/// Used when the container carries no frame count. One packet holds one
/// video frame, so the count is exact.
pub(crate) fn count_video_packets(path: &Path) -> Result<usize, VideoError> {
    let label = path.display().to_string();
    let mut ictx =
        ffmpeg_next::format::input(path).map_err(|e| VideoError::unavailable(&label, e))?;
    let stream_index = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .map(|stream| stream.index())
        .ok_or_else(|| VideoError::unavailable(&label, "no video stream found"))?;
    Ok(ictx
        .packets()
        .filter(|(stream, _)| stream.index() == stream_index)
        .count())
}

fn to_duration(ts: i64, time_base: ffmpeg_next::Rational) -> Option<Duration> {
    if ts < 0 || time_base.denominator() == 0 {
        return None;
    }
    let seconds = ts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    Some(Duration::from_secs_f64(seconds))
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may pad each row (stride > width * 3); the padding is
/// dropped.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::test_video::create_test_video;

    #[test]
    fn test_container_frame_count() {
        assert_eq!(container_frame_count(120), Some(120));
        assert_eq!(container_frame_count(0), None);
        assert_eq!(container_frame_count(-1), None);
    }

    #[test]
    fn test_count_video_packets_matches_written_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count.mkv");
        create_test_video(&path, 7, 64, 48, 25);
        assert_eq!(count_video_packets(&path).unwrap(), 7);
    }

    #[test]
    fn test_count_video_packets_missing_file() {
        ffmpeg_next::init().unwrap();
        assert!(matches!(
            count_video_packets(Path::new("/nonexistent/clip.mkv")),
            Err(VideoError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_to_duration() {
        let tb = ffmpeg_next::Rational(1, 30);
        assert_eq!(to_duration(15, tb), Some(Duration::from_millis(500)));
        assert_eq!(to_duration(-3, tb), None);
        assert_eq!(to_duration(3, ffmpeg_next::Rational(1, 0)), None);
    }
}
