use std::collections::HashMap;
use std::time::Duration;

use crate::shared::annotation::AnnotationLayer;
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;

/// A surface that renders frames and their annotation layers.
///
/// Windows are addressed by title. Acquire them through [`Window::open`] so
/// they are released when the guard goes out of scope.
pub trait Display {
    fn open_window(&mut self, title: &str) -> Result<(), VideoError>;

    /// Renders `frame` with its optional overlay, then blocks for `delay`.
    fn show(
        &mut self,
        title: &str,
        frame: &Frame,
        annotations: Option<&AnnotationLayer>,
        delay: Duration,
    ) -> Result<(), VideoError>;

    /// Releases the window. Idempotent.
    fn close_window(&mut self, title: &str);
}

/// Scoped handle to one open window.
pub struct Window<'a, D: Display + ?Sized> {
    display: &'a mut D,
    title: String,
}

impl<'a, D: Display + ?Sized> Window<'a, D> {
    pub fn open(display: &'a mut D, title: impl Into<String>) -> Result<Self, VideoError> {
        let title = title.into();
        display.open_window(&title)?;
        Ok(Self { display, title })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn show(
        &mut self,
        frame: &Frame,
        annotations: Option<&AnnotationLayer>,
        delay: Duration,
    ) -> Result<(), VideoError> {
        self.display.show(&self.title, frame, annotations, delay)
    }
}

impl<D: Display + ?Sized> Drop for Window<'_, D> {
    fn drop(&mut self) {
        self.display.close_window(&self.title);
    }
}

/// Headless display: renders nothing, counts frames per window.
#[derive(Debug, Default)]
pub struct NullDisplay {
    open: HashMap<String, usize>,
    shown: usize,
}

impl NullDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, title: &str) -> bool {
        self.open.contains_key(title)
    }

    /// Frames shown across all windows.
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl Display for NullDisplay {
    fn open_window(&mut self, title: &str) -> Result<(), VideoError> {
        self.open.entry(title.to_string()).or_insert(0);
        Ok(())
    }

    fn show(
        &mut self,
        title: &str,
        _frame: &Frame,
        _annotations: Option<&AnnotationLayer>,
        delay: Duration,
    ) -> Result<(), VideoError> {
        let count = self
            .open
            .get_mut(title)
            .ok_or_else(|| VideoError::Display(format!("window '{title}' is not open")))?;
        *count += 1;
        self.shown += 1;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    fn close_window(&mut self, title: &str) {
        self.open.remove(title);
    }
}
