use std::path::{Path, PathBuf};

use log::debug;

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::frame_source::{FrameSource, SeekableSource};
use crate::video::domain::source_descriptor::wildcard_match;

/// Plays an ordered list of still image files as a video.
///
/// Each file is decoded with the `image` crate when its frame is read, so
/// the list supports random access. Geometry in the metadata comes from the
/// first file; later files may differ.
pub struct ImageFileListSource {
    files: Vec<PathBuf>,
    next: usize,
    metadata: SourceMetadata,
}

impl ImageFileListSource {
    /// Uses `files` in the given order. The first file must be readable.
    pub fn new(files: Vec<PathBuf>) -> Result<Self, VideoError> {
        let first = files
            .first()
            .ok_or_else(|| VideoError::unavailable("<empty file list>", "no image files"))?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| VideoError::unavailable(first.display(), e))?;
        let codec = first
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        debug!(
            "Opened image list of {} files starting at {}",
            files.len(),
            first.display()
        );
        let metadata = SourceMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: Some(files.len()),
            codec,
            source_path: Some(first.clone()),
        };
        Ok(Self {
            files,
            next: 0,
            metadata,
        })
    }

    /// Sorted files in `dir` whose names match `pattern` (`*` and `?`
    /// wildcards).
    pub fn from_directory(dir: &Path, pattern: &str) -> Result<Self, VideoError> {
        let entries = std::fs::read_dir(dir).map_err(|e| VideoError::unavailable(dir.display(), e))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| wildcard_match(pattern, name))
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(VideoError::unavailable(
                dir.join(pattern).display(),
                "no files match the pattern",
            ));
        }
        let mut source = Self::new(files)?;
        source.metadata.source_path = Some(dir.to_path_buf());
        Ok(source)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageFileListSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read_next(&mut self) -> Result<Option<Frame>, VideoError> {
        let index = self.next;
        let Some(path) = self.files.get(index) else {
            return Ok(None);
        };
        self.next += 1;
        let img = image::open(path).map_err(|e| {
            VideoError::decode(index, format!("image file is not valid: {}: {e}", path.display()))
        })?;
        Ok(Some(Frame::from_image(img, index)))
    }

    fn close(&mut self) {
        self.next = self.files.len();
    }
}

impl SeekableSource for ImageFileListSource {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn seek(&mut self, index: usize) -> Result<(), VideoError> {
        if index > self.files.len() {
            return Err(VideoError::OutOfRange {
                index,
                start: 0,
                end: self.files.len().saturating_sub(1),
            });
        }
        self.next = index;
        Ok(())
    }
}
