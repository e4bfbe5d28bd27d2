use std::path::Path;

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Saves frames with the `image` crate; the format follows the file
/// extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), VideoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| VideoError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let img = match size {
            Some((w, h)) => frame.letterboxed(w, h)?.to_image()?,
            None => frame.to_image()?,
        };

        img.save(path).map_err(|e| match e {
            image::ImageError::IoError(source) => VideoError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => VideoError::InvalidArgument(format!(
                "cannot encode {}: {other}",
                path.display()
            )),
        })
    }
}
