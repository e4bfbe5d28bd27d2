use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::shared::annotation::AnnotationLayer;
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::video::domain::display::Display;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::infrastructure::image_file_writer::ImageFileWriter;

/// Headless display that records what would have been shown.
///
/// Each window gets a sub-directory named after its title. Shown frames are
/// written as `frame_<index>.png`; a non-empty annotation layer is written
/// next to it as `frame_<index>.json`.
pub struct ImageDirDisplay {
    root: PathBuf,
    writer: Box<dyn ImageWriter>,
    windows: HashMap<String, PathBuf>,
    sleep: bool,
}

impl ImageDirDisplay {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writer: Box::new(ImageFileWriter::new()),
            windows: HashMap::new(),
            sleep: false,
        }
    }

    /// Honour the delay passed to `show` instead of returning immediately.
    pub fn with_delay(mut self) -> Self {
        self.sleep = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing the window `title`, if it is open.
    pub fn window_dir(&self, title: &str) -> Option<&Path> {
        self.windows.get(title).map(PathBuf::as_path)
    }
}

/// Keeps titles usable as a single path component.
fn window_dir_name(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.trim_matches('.') {
        "" => "window".to_string(),
        trimmed => trimmed.to_string(),
    }
}

impl Display for ImageDirDisplay {
    fn open_window(&mut self, title: &str) -> Result<(), VideoError> {
        if self.windows.contains_key(title) {
            return Ok(());
        }
        let dir = self.root.join(window_dir_name(title));
        std::fs::create_dir_all(&dir).map_err(|source| VideoError::Io {
            path: dir.clone(),
            source,
        })?;
        debug!("Opened window '{title}' at {}", dir.display());
        self.windows.insert(title.to_string(), dir);
        Ok(())
    }

    fn show(
        &mut self,
        title: &str,
        frame: &Frame,
        annotations: Option<&AnnotationLayer>,
        delay: Duration,
    ) -> Result<(), VideoError> {
        let dir = self
            .windows
            .get(title)
            .ok_or_else(|| VideoError::Display(format!("window '{title}' is not open")))?;
        let stem = format!("frame_{:06}", frame.index());
        self.writer
            .write(&dir.join(format!("{stem}.png")), frame, None)?;

        if let Some(layer) = annotations.filter(|l| !l.is_empty()) {
            let path = dir.join(format!("{stem}.json"));
            let json = layer
                .to_json()
                .map_err(|e| VideoError::Display(format!("cannot serialise annotations: {e}")))?;
            std::fs::write(&path, json).map_err(|source| VideoError::Io { path, source })?;
        }

        if self.sleep && !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    fn close_window(&mut self, title: &str) {
        if self.windows.remove(title).is_some() {
            debug!("Closed window '{title}'");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::annotation::WHITE;
    use crate::shared::geometry::Point;
    use crate::video::domain::display::Window;
    use rstest::rstest;

    #[rstest]
    #[case::plain("preview", "preview")]
    #[case::spaces("my clip: 1", "my_clip__1")]
    #[case::path_like("../x", "_x")]
    #[case::empty("", "window")]
    fn test_window_dir_name(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(window_dir_name(title), expected);
    }

    #[test]
    fn test_show_writes_png_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = ImageDirDisplay::new(dir.path());
        let mut layer = AnnotationLayer::new();
        layer.text("Frame: 7", Point::new(10, 10), WHITE, None);
        {
            let mut window = Window::open(&mut display, "preview").unwrap();
            window
                .show(&Frame::zeros(8, 6, 3, 7), Some(&layer), Duration::ZERO)
                .unwrap();
            window
                .show(&Frame::zeros(8, 6, 3, 8), None, Duration::ZERO)
                .unwrap();
        }

        let window_dir = dir.path().join("preview");
        assert!(window_dir.join("frame_000007.png").exists());
        assert!(window_dir.join("frame_000008.png").exists());
        assert!(!window_dir.join("frame_000008.json").exists());

        let sidecar = std::fs::read_to_string(window_dir.join("frame_000007.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(value["annotations"][0]["kind"], "text");
        assert_eq!(value["annotations"][0]["text"], "Frame: 7");
        assert!(display.window_dir("preview").is_none());
    }

    #[test]
    fn test_show_on_closed_window_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = ImageDirDisplay::new(dir.path());
        let err = display
            .show("nope", &Frame::zeros(2, 2, 3, 0), None, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, VideoError::Display(_)));
    }
}
