use log::info;

use crate::shared::error::VideoError;
use crate::video::domain::source_descriptor::{is_image, SourceDescriptor};
use crate::video::domain::video::Video;
use crate::video::infrastructure::ffmpeg_live_source::FfmpegLiveSource;
use crate::video::infrastructure::ffmpeg_video_source::FfmpegVideoSource;
use crate::video::infrastructure::image_file_list_source::ImageFileListSource;

/// Resolves a descriptor to a ready-to-read [`Video`].
///
/// Files, directories and file lists open seekable; cameras and streams
/// open live. Every resolution failure is `SourceUnavailable`.
pub fn open(descriptor: &SourceDescriptor) -> Result<Video, VideoError> {
    let video = match descriptor {
        SourceDescriptor::File(path) if is_image(path) => {
            if !path.is_file() {
                return Err(VideoError::unavailable(path.display(), "file not found"));
            }
            Video::seekable(ImageFileListSource::new(vec![path.clone()])?)
        }
        SourceDescriptor::File(path) => Video::seekable(FfmpegVideoSource::open(path)?),
        SourceDescriptor::Directory { path, pattern } => {
            Video::seekable(ImageFileListSource::from_directory(path, pattern)?)
        }
        SourceDescriptor::FileList(paths) => {
            Video::seekable(ImageFileListSource::new(paths.clone())?)
        }
        SourceDescriptor::Camera(index) => Video::live(FfmpegLiveSource::camera(*index)?),
        SourceDescriptor::Stream(url) => Video::live(FfmpegLiveSource::stream(url)?),
    };
    info!("Opened {descriptor}");
    Ok(video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::test_video::clip;
    use std::path::{Path, PathBuf};

    fn write_png(dir: &Path, name: &str, value: u8) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(8, 6, image::Rgb([value, value, value]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let descriptor = SourceDescriptor::File("/nonexistent/clip.mp4".into());
        assert!(matches!(
            open(&descriptor),
            Err(VideoError::SourceUnavailable { .. })
        ));
        let descriptor = SourceDescriptor::File("/nonexistent/still.png".into());
        assert!(matches!(
            open(&descriptor),
            Err(VideoError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let descriptor = SourceDescriptor::directory("/nonexistent/frames");
        assert!(matches!(
            open(&descriptor),
            Err(VideoError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_still_image_is_one_frame_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "still.png", 9);
        let video = open(&SourceDescriptor::File(path)).unwrap();
        assert!(video.is_seekable());
        assert_eq!(video.len(), Some(1));
        assert_eq!(video.count(), 1);
    }

    #[test]
    fn test_directory_with_pattern() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in ["b.png", "a.png", "c.jpg"].iter().enumerate() {
            write_png(dir.path(), name, i as u8);
        }
        let descriptor = SourceDescriptor::Directory {
            path: dir.path().to_path_buf(),
            pattern: "*.png".into(),
        };
        let video = open(&descriptor).unwrap();
        assert_eq!(video.frame_count(), Some(2));
        let values: Vec<u8> = video.map(|f| f.unwrap().data()[0]).collect();
        // Sorted by name: a.png (1) then b.png (0).
        assert_eq!(values, vec![1, 0]);
    }

    #[test]
    fn test_file_list_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 10);
        let b = write_png(dir.path(), "b.png", 20);
        let video = open(&SourceDescriptor::FileList(vec![b, a])).unwrap();
        let values: Vec<u8> = video.map(|f| f.unwrap().data()[0]).collect();
        assert_eq!(values, vec![20, 10]);
    }

    #[test]
    fn test_video_file_opens_seekable() {
        let dir = tempfile::tempdir().unwrap();
        let path = clip(dir.path(), 4);
        let mut video = open(&SourceDescriptor::File(path)).unwrap();
        assert!(video.is_seekable());
        video.seek(2).unwrap();
        assert_eq!(video.next_frame().unwrap().unwrap().index(), 2);
    }
}
