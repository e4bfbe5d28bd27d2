use log::debug;

use crate::shared::annotation::{AnnotationLayer, BLACK, GRAY, WHITE, YELLOW};
use crate::shared::constants::{MONTAGE_DEFAULT_GUTTER, MONTAGE_SCROLL_PAD};
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::geometry::{Point, Rect};

/// What to print in the lower-left corner of each tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileLabels {
    None,
    /// The frame's position in the montage list.
    Index,
    /// One label per frame.
    Custom(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MontageOptions {
    /// Tiles per page as (rows, cols).
    pub layout: (u32, u32),
    /// Tile size as (width, height).
    pub tile_size: (u32, u32),
    pub gutter: u32,
    /// Fill a row before moving to the next one; otherwise fill columns.
    pub by_row: bool,
    pub labels: TileLabels,
    /// Letterbox tiles instead of stretching them.
    pub keep_aspect: bool,
    /// Outline tiles the user has selected.
    pub highlight_selected: bool,
}

impl Default for MontageOptions {
    fn default() -> Self {
        Self {
            layout: (2, 4),
            tile_size: (64, 48),
            gutter: MONTAGE_DEFAULT_GUTTER,
            by_row: true,
            labels: TileLabels::Index,
            keep_aspect: true,
            highlight_selected: false,
        }
    }
}

/// Result of a click on the montage canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MontageClick {
    /// Scrolled back one row (or column).
    Decrement,
    /// Scrolled forward one row (or column).
    Increment,
    /// Toggled selection of the frame with this index.
    Tile(usize),
    Nothing,
}

/// Thumbnails of a list of frames composed into one grid image.
///
/// When there are more frames than tiles the montage pages: a 25 px strip
/// is reserved on both ends of the scroll axis for the scroll arrows, and
/// clicking a strip scrolls by one row (or column). Labels, selection
/// highlights and arrows are produced as an [`AnnotationLayer`] over the
/// canvas rather than drawn into it.
pub struct ImageMontage {
    frames: Vec<Frame>,
    options: MontageOptions,
    offset: usize,
    pad: (u32, u32),
    canvas: Frame,
    overlay: AnnotationLayer,
    tiles: Vec<(usize, Rect)>,
    selected: Vec<usize>,
}

impl ImageMontage {
    pub fn new(frames: Vec<Frame>, options: MontageOptions) -> Result<Self, VideoError> {
        let (rows, cols) = options.layout;
        if rows == 0 || cols == 0 {
            return Err(VideoError::InvalidArgument(format!(
                "montage layout {rows}x{cols} has no tiles"
            )));
        }
        if options.tile_size.0 == 0 || options.tile_size.1 == 0 {
            return Err(VideoError::InvalidArgument(
                "montage tiles must be at least 1x1".into(),
            ));
        }
        if let TileLabels::Custom(labels) = &options.labels {
            if labels.len() != frames.len() {
                return Err(VideoError::InvalidArgument(format!(
                    "{} labels given for {} frames",
                    labels.len(),
                    frames.len()
                )));
            }
        }

        let pad = scroll_pad(&options, frames.len());
        let (width, height) = canvas_size(&options, frames.len())?;
        let mut montage = Self {
            frames,
            options,
            offset: 0,
            pad,
            canvas: Frame::zeros(width, height, 3, 0),
            overlay: AnnotationLayer::new(),
            tiles: Vec::new(),
            selected: Vec::new(),
        };
        montage.draw()?;
        Ok(montage)
    }

    /// Recomposes the current page into the canvas and rebuilds the overlay.
    pub fn draw(&mut self) -> Result<(), VideoError> {
        let (width, height) = self.canvas.size();
        self.canvas = Frame::zeros(width, height, 3, 0);
        self.overlay.clear();
        self.tiles.clear();

        let (rows, cols) = self.options.layout;
        if self.offset > 0 {
            let arrow = self.decrement_arrow();
            self.overlay.polygon(arrow, GRAY, true);
        }
        if self.offset + self.page_len() < self.frames.len() {
            let arrow = self.increment_arrow();
            self.overlay.polygon(arrow, GRAY, true);
        }

        let slots: Vec<(u32, u32)> = if self.options.by_row {
            (0..rows).flat_map(|r| (0..cols).map(move |c| (r, c))).collect()
        } else {
            (0..cols).flat_map(|c| (0..rows).map(move |r| (r, c))).collect()
        };
        for ((row, col), index) in slots.into_iter().zip(self.offset..self.frames.len()) {
            self.composite(index, row, col)?;
        }
        Ok(())
    }

    /// Handles a click at canvas coordinates (`x`, `y`), scrolling or
    /// toggling tile selection, and redraws when anything changed.
    pub fn click(&mut self, x: i32, y: i32) -> Result<MontageClick, VideoError> {
        let p = Point::new(x, y);
        let (decrement, increment) = self.scroll_regions();
        let result = if increment.contains(p) {
            if self.offset + self.page_len() < self.frames.len() {
                self.offset += self.scroll_step();
                MontageClick::Increment
            } else {
                MontageClick::Nothing
            }
        } else if decrement.contains(p) {
            if self.offset > 0 {
                self.offset = self.offset.saturating_sub(self.scroll_step());
                MontageClick::Decrement
            } else {
                MontageClick::Nothing
            }
        } else if let Some(&(index, _)) = self.tiles.iter().find(|(_, rect)| rect.contains(p)) {
            match self.selected.iter().position(|&s| s == index) {
                Some(at) => {
                    self.selected.remove(at);
                }
                None => self.selected.push(index),
            }
            MontageClick::Tile(index)
        } else {
            MontageClick::Nothing
        };

        if result != MontageClick::Nothing {
            debug!("Montage click at ({x}, {y}): {result:?}");
            self.draw()?;
        }
        Ok(result)
    }

    /// Indices of the selected frames, ascending.
    pub fn selected(&self) -> Vec<usize> {
        let mut selected = self.selected.clone();
        selected.sort_unstable();
        selected
    }

    /// Replaces the selection and redraws.
    pub fn set_selected(&mut self, indices: Vec<usize>) -> Result<(), VideoError> {
        self.selected = indices;
        self.draw()
    }

    /// The composed canvas from the last draw.
    pub fn frame(&self) -> &Frame {
        &self.canvas
    }

    pub fn into_frame(self) -> Frame {
        self.canvas
    }

    /// Labels, highlights and scroll arrows for the current page.
    pub fn annotations(&self) -> &AnnotationLayer {
        &self.overlay
    }

    /// Frame index and canvas rectangle of every tile on the current page.
    pub fn tiles(&self) -> &[(usize, Rect)] {
        &self.tiles
    }

    pub fn size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    pub fn tile_size(&self) -> (u32, u32) {
        self.options.tile_size
    }

    pub fn layout(&self) -> (u32, u32) {
        self.options.layout
    }

    /// Index of the first frame on the current page.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<String> {
        match &self.options.labels {
            TileLabels::None => None,
            TileLabels::Index => (index < self.frames.len()).then(|| index.to_string()),
            TileLabels::Custom(labels) => labels.get(index).cloned(),
        }
    }

    fn composite(&mut self, index: usize, row: u32, col: u32) -> Result<(), VideoError> {
        let (tw, th) = self.options.tile_size;
        let gutter = self.options.gutter;
        let x = col * (tw + gutter) + gutter + self.pad.0;
        let y = row * (th + gutter) + gutter + self.pad.1;

        let source = self.frames[index].to_rgb()?;
        let tile = if self.options.keep_aspect {
            source.letterboxed(tw, th)?
        } else {
            source.resized(tw, th)?
        };
        self.canvas.paste(&tile, x, y);

        let rect = Rect::new(x as i32, y as i32, tw as i32, th as i32);
        self.tiles.push((index, rect));

        if let Some(text) = self.label(index) {
            let at = Point::new(rect.x + 1, rect.y + th as i32 - gutter as i32 - 2);
            self.overlay.text(text, at, WHITE, Some(BLACK));
        }
        if self.options.highlight_selected && self.selected.contains(&index) {
            self.overlay.rect(rect, YELLOW, false);
        }
        Ok(())
    }

    fn page_len(&self) -> usize {
        let (rows, cols) = self.options.layout;
        (rows * cols) as usize
    }

    fn scroll_step(&self) -> usize {
        let (rows, cols) = self.options.layout;
        if self.options.by_row {
            cols as usize
        } else {
            rows as usize
        }
    }

    /// (decrement, increment) click regions. Empty when not paging.
    fn scroll_regions(&self) -> (Rect, Rect) {
        let (w, h) = self.canvas.size();
        let (w, h) = (w as i32, h as i32);
        let (xpad, ypad) = (self.pad.0 as i32, self.pad.1 as i32);
        if self.options.by_row {
            (Rect::new(0, 0, w, ypad), Rect::new(0, h - ypad, w, ypad))
        } else {
            (Rect::new(0, 0, xpad, h), Rect::new(w - xpad, 0, xpad, h))
        }
    }

    fn decrement_arrow(&self) -> Vec<Point> {
        let (w, h) = self.canvas.size();
        let (w, h) = (w as i32, h as i32);
        if self.options.by_row {
            let pad = self.pad.1 as i32;
            let (x, half) = (w / 2, pad / 2);
            vec![
                Point::new(x, 2),
                Point::new(x + half, pad - 2),
                Point::new(x - half, pad - 2),
            ]
        } else {
            let pad = self.pad.0 as i32;
            let (y, half) = (h / 2, pad / 2);
            vec![
                Point::new(2, y),
                Point::new(pad - 1, y - half),
                Point::new(pad - 1, y + half),
            ]
        }
    }

    fn increment_arrow(&self) -> Vec<Point> {
        let (w, h) = self.canvas.size();
        let (w, h) = (w as i32, h as i32);
        if self.options.by_row {
            let pad = self.pad.1 as i32;
            let (x, y, half) = (w / 2, h - 3, pad / 2);
            vec![
                Point::new(x, y),
                Point::new(x + half, y - pad + 3),
                Point::new(x - half, y - pad + 3),
            ]
        } else {
            let pad = self.pad.0 as i32;
            let (x, y, half) = (w - 2, h / 2, pad / 2);
            vec![
                Point::new(x, y),
                Point::new(x - pad + 2, y - half),
                Point::new(x - pad + 2, y + half),
            ]
        }
    }
}

/// (x, y) padding reserved for scroll arrows.
fn scroll_pad(options: &MontageOptions, frame_count: usize) -> (u32, u32) {
    let (rows, cols) = options.layout;
    let per_page = (rows as usize).saturating_mul(cols as usize);
    if per_page >= frame_count {
        (0, 0)
    } else if options.by_row {
        (0, MONTAGE_SCROLL_PAD)
    } else {
        (MONTAGE_SCROLL_PAD, 0)
    }
}

/// Canvas size for `frame_count` frames under `options`. Fails when either
/// side does not fit in a `u32`.
pub fn canvas_size(options: &MontageOptions, frame_count: usize) -> Result<(u32, u32), VideoError> {
    let (rows, cols) = options.layout;
    let (tw, th) = options.tile_size;
    let g = options.gutter;
    let (xpad, ypad) = scroll_pad(options, frame_count);
    let side = |count: u32, tile: u32, pad: u32| {
        tile.checked_add(g)?
            .checked_mul(count)?
            .checked_add(g)?
            .checked_add(pad.checked_mul(2)?)
    };
    match (side(cols, tw, xpad), side(rows, th, ypad)) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(VideoError::InvalidArgument(format!(
            "montage of {rows}x{cols} tiles of {tw}x{th} is too large"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::annotation::Annotation;
    use rstest::rstest;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(vec![(i * 10 + 5) as u8; 8 * 6 * 3], 8, 6, 3, i))
            .collect()
    }

    fn options(layout: (u32, u32), by_row: bool) -> MontageOptions {
        MontageOptions {
            layout,
            tile_size: (8, 6),
            by_row,
            ..MontageOptions::default()
        }
    }

    fn texts(layer: &AnnotationLayer) -> Vec<String> {
        layer
            .annotations()
            .iter()
            .filter_map(|a| match a {
                Annotation::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn polygons(layer: &AnnotationLayer) -> usize {
        layer
            .annotations()
            .iter()
            .filter(|a| matches!(a, Annotation::Polygon { .. }))
            .count()
    }

    #[rstest]
    #[case::fits((2, 4), true, 8, (42, 18))]
    #[case::pages_by_row((2, 4), true, 9, (42, 68))]
    #[case::pages_by_col((2, 4), false, 9, (92, 18))]
    fn test_canvas_size(
        #[case] layout: (u32, u32),
        #[case] by_row: bool,
        #[case] n: usize,
        #[case] expected: (u32, u32),
    ) {
        // cols * (8 + 2) + 2 + 2 * xpad, rows * (6 + 2) + 2 + 2 * ypad
        assert_eq!(canvas_size(&options(layout, by_row), n).unwrap(), expected);
        let montage = ImageMontage::new(frames(n), options(layout, by_row)).unwrap();
        assert_eq!(montage.size(), expected);
    }

    #[rstest]
    #[case((1, 2), (u32::MAX, 10))]
    #[case((3, 1), (10, u32::MAX / 2))]
    fn test_oversized_canvas_is_rejected(#[case] layout: (u32, u32), #[case] tile_size: (u32, u32)) {
        let options = MontageOptions {
            tile_size,
            ..options(layout, true)
        };
        assert!(matches!(
            canvas_size(&options, 2),
            Err(VideoError::InvalidArgument(_))
        ));
        assert!(matches!(
            ImageMontage::new(frames(2), options),
            Err(VideoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let o = MontageOptions::default();
        assert_eq!(o.layout, (2, 4));
        assert_eq!(o.tile_size, (64, 48));
        assert_eq!(o.gutter, 2);
        assert!(o.by_row && o.keep_aspect && !o.highlight_selected);
        assert_eq!(o.labels, TileLabels::Index);
    }

    #[test]
    fn test_invalid_layout_and_labels() {
        assert!(ImageMontage::new(frames(2), options((0, 3), true)).is_err());
        let bad_labels = MontageOptions {
            labels: TileLabels::Custom(vec!["only one".into()]),
            ..options((1, 2), true)
        };
        assert!(matches!(
            ImageMontage::new(frames(2), bad_labels),
            Err(VideoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_tiles_placed_by_row() {
        let montage = ImageMontage::new(frames(3), options((2, 2), true)).unwrap();
        let rects: Vec<(usize, Rect)> = montage.tiles().to_vec();
        assert_eq!(
            rects,
            vec![
                (0, Rect::new(2, 2, 8, 6)),
                (1, Rect::new(12, 2, 8, 6)),
                (2, Rect::new(2, 10, 8, 6)),
            ]
        );
        let canvas = montage.frame().as_ndarray();
        assert_eq!(canvas[[2, 12, 0]], 15);
        assert_eq!(canvas[[10, 2, 0]], 25);
        // gutter and empty fourth tile stay black
        assert_eq!(canvas[[0, 0, 0]], 0);
        assert_eq!(canvas[[12, 14, 0]], 0);
    }

    #[test]
    fn test_tiles_placed_by_column() {
        let montage = ImageMontage::new(frames(3), options((2, 2), false)).unwrap();
        let positions: Vec<Rect> = montage.tiles().iter().map(|(_, r)| *r).collect();
        assert_eq!(positions[1], Rect::new(2, 10, 8, 6));
        assert_eq!(positions[2], Rect::new(12, 2, 8, 6));
    }

    #[test]
    fn test_index_and_custom_labels() {
        let montage = ImageMontage::new(frames(3), options((1, 3), true)).unwrap();
        assert_eq!(texts(montage.annotations()), vec!["0", "1", "2"]);

        let custom = MontageOptions {
            labels: TileLabels::Custom(vec!["a".into(), "b".into()]),
            ..options((1, 2), true)
        };
        let montage = ImageMontage::new(frames(2), custom).unwrap();
        assert_eq!(texts(montage.annotations()), vec!["a", "b"]);

        let none = MontageOptions {
            labels: TileLabels::None,
            ..options((1, 2), true)
        };
        let montage = ImageMontage::new(frames(2), none).unwrap();
        assert!(texts(montage.annotations()).is_empty());
    }

    #[test]
    fn test_scrolling_by_row() {
        let mut montage = ImageMontage::new(frames(7), options((1, 3), true)).unwrap();
        let (w, h) = montage.size();
        assert_eq!(polygons(montage.annotations()), 1);

        assert_eq!(montage.click(5, 5).unwrap(), MontageClick::Nothing);
        assert_eq!(
            montage.click(w as i32 / 2, h as i32 - 5).unwrap(),
            MontageClick::Increment
        );
        assert_eq!(montage.offset(), 3);
        assert_eq!(polygons(montage.annotations()), 2);
        assert_eq!(montage.tiles()[0].0, 3);

        montage.click(w as i32 / 2, h as i32 - 5).unwrap();
        assert_eq!(montage.offset(), 6);
        assert_eq!(montage.tiles().len(), 1);
        assert_eq!(
            montage.click(w as i32 / 2, h as i32 - 5).unwrap(),
            MontageClick::Nothing
        );

        assert_eq!(montage.click(5, 5).unwrap(), MontageClick::Decrement);
        assert_eq!(montage.offset(), 3);
    }

    #[test]
    fn test_tile_click_toggles_selection() {
        let mut montage = ImageMontage::new(
            frames(4),
            MontageOptions {
                highlight_selected: true,
                ..options((2, 2), true)
            },
        )
        .unwrap();
        assert_eq!(montage.click(14, 12).unwrap(), MontageClick::Tile(3));
        assert_eq!(montage.click(3, 3).unwrap(), MontageClick::Tile(0));
        assert_eq!(montage.selected(), vec![0, 3]);
        let highlights = montage
            .annotations()
            .annotations()
            .iter()
            .filter(|a| matches!(a, Annotation::Rect { color, .. } if *color == YELLOW))
            .count();
        assert_eq!(highlights, 2);

        montage.click(14, 12).unwrap();
        assert_eq!(montage.selected(), vec![0]);

        montage.set_selected(vec![2, 1]).unwrap();
        assert_eq!(montage.selected(), vec![1, 2]);
        // gutter click
        assert_eq!(montage.click(1, 1).unwrap(), MontageClick::Nothing);
    }

    #[test]
    fn test_gray_frames_become_rgb_tiles() {
        let gray = vec![Frame::new(vec![90; 16], 4, 4, 1, 0)];
        let montage = ImageMontage::new(gray, options((1, 1), true)).unwrap();
        assert_eq!(montage.frame().channels(), 3);
    }
}
