use std::time::Duration;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// URL schemes handed to ffmpeg as network streams.
pub const STREAM_SCHEMES: &[&str] = &["rtsp", "rtmp", "http", "https", "udp", "tcp"];

pub const DEFAULT_PLAY_DELAY: Duration = Duration::from_millis(20);
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;
pub const DEFAULT_DIRECTORY_PATTERN: &str = "*";

/// Frame rate for saved movies when neither the caller nor the source has one.
pub const DEFAULT_SAVE_FPS: i32 = 15;

pub const FRAME_LABEL_POSITION: (i32, i32) = (10, 10);

pub const MONTAGE_SCROLL_PAD: u32 = 25;
pub const MONTAGE_DEFAULT_GUTTER: u32 = 2;
pub const MONTAGE_MIN_TILE: (u32, u32) = (32, 24);
