//! Synthetic clips for decoder tests.

use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_video_writer::FfmpegVideoWriter;

/// Encodes `num_frames` flat gray frames as MPEG-4. Frame `i` has value
/// `(i * 40) % 256` in every channel. The container follows the extension.
pub(crate) fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: i32) {
    let metadata = SourceMetadata {
        width,
        height,
        fps: f64::from(fps),
        total_frames: None,
        codec: String::new(),
        source_path: None,
    };
    let mut writer = FfmpegVideoWriter::new();
    writer.open(path, &metadata).unwrap();
    for i in 0..num_frames {
        let value = ((i * 40) % 256) as u8;
        let pixels = vec![value; (width * height * 3) as usize];
        writer.write(&Frame::new(pixels, width, height, 3, i)).unwrap();
    }
    writer.close().unwrap();
}

/// Path of a fresh `clip.mp4` with `num_frames` 160x120 frames at 30 fps.
pub(crate) fn clip(dir: &Path, num_frames: usize) -> PathBuf {
    let path = dir.join("clip.mp4");
    create_test_video(&path, num_frames, 160, 120, 30);
    path
}
