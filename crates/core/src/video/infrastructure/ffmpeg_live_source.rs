use log::{debug, info};

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::frame_source::FrameSource;
use crate::video::infrastructure::ffmpeg_decoder::FfmpegDecoder;

#[cfg(target_os = "linux")]
const CAMERA_INPUT_FORMAT: &str = "video4linux2,v4l2";
#[cfg(target_os = "macos")]
const CAMERA_INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const CAMERA_INPUT_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAMERA_INPUT_FORMAT: &str = "";

/// Unbounded source over a capture device or network stream.
///
/// Frames are numbered from 0 in arrival order. Live sources cannot seek;
/// only forward cueing through the sequence is possible.
pub struct FfmpegLiveSource {
    label: String,
    decoder: Option<FfmpegDecoder>,
    metadata: SourceMetadata,
}

impl FfmpegLiveSource {
    /// Opens local capture device `index` through the platform input device.
    pub fn camera(index: u32) -> Result<Self, VideoError> {
        let label = format!("camera {index}");
        ffmpeg_next::init().map_err(|e| VideoError::unavailable(&label, e))?;
        ffmpeg_next::device::register_all();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == CAMERA_INPUT_FORMAT)
            .ok_or_else(|| VideoError::unavailable(&label, "no camera input device available"))?;
        let url = camera_url(index);
        let ictx = match ffmpeg_next::format::open_with(
            &url,
            &ffmpeg_next::format::Format::Input(format),
            ffmpeg_next::Dictionary::new(),
        ) {
            Ok(ffmpeg_next::format::context::Context::Input(ictx)) => ictx,
            Ok(_) => return Err(VideoError::unavailable(&label, "not an input device")),
            Err(e) => return Err(VideoError::unavailable(&label, e)),
        };
        Self::from_input(ictx, label)
    }

    /// Connects to a network stream. RTSP is forced onto TCP.
    pub fn stream(url: &str) -> Result<Self, VideoError> {
        ffmpeg_next::init().map_err(|e| VideoError::unavailable(url, e))?;
        ffmpeg_next::format::network::init();

        let mut options = ffmpeg_next::Dictionary::new();
        if url.to_ascii_lowercase().starts_with("rtsp://") {
            options.set("rtsp_transport", "tcp");
        }
        let ictx = ffmpeg_next::format::input_with_dictionary(&url, options)
            .map_err(|e| VideoError::unavailable(url, e))?;
        Self::from_input(ictx, url.to_string())
    }

    fn from_input(
        ictx: ffmpeg_next::format::context::Input,
        label: String,
    ) -> Result<Self, VideoError> {
        let (decoder, mut metadata) = FfmpegDecoder::new(ictx, &label, true)?;
        metadata.source_path = None;
        info!(
            "Connected to {label} ({}x{}, {:.2} fps)",
            metadata.width, metadata.height, metadata.fps
        );
        Ok(Self {
            label,
            decoder: Some(decoder),
            metadata,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

fn camera_url(index: u32) -> String {
    if cfg!(target_os = "linux") {
        format!("/dev/video{index}")
    } else if cfg!(target_os = "windows") {
        format!("video={index}")
    } else {
        index.to_string()
    }
}

impl FrameSource for FfmpegLiveSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read_next(&mut self) -> Result<Option<Frame>, VideoError> {
        match self.decoder.as_mut() {
            Some(decoder) => decoder.decode_next(),
            None => Err(VideoError::Closed),
        }
    }

    fn frame_count(&self) -> Option<usize> {
        None
    }

    fn close(&mut self) {
        if self.decoder.take().is_some() {
            debug!("Disconnected from {}", self.label);
        }
    }
}
