use serde::Serialize;

use crate::shared::geometry::{Point, Rect};

pub type Color = [u8; 3];

pub const WHITE: Color = [255, 255, 255];
pub const BLACK: Color = [0, 0, 0];
pub const GRAY: Color = [125, 125, 125];
pub const YELLOW: Color = [255, 255, 0];

/// One overlay element. Coordinates are in the pixel space of the frame
/// the layer accompanies.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Point {
        at: Point,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
    },
    Rect {
        rect: Rect,
        color: Color,
        filled: bool,
    },
    Circle {
        center: Point,
        radius: u32,
        color: Color,
    },
    Polygon {
        points: Vec<Point>,
        color: Color,
        filled: bool,
    },
    Text {
        text: String,
        at: Point,
        color: Color,
        background: Option<Color>,
    },
}

/// Overlay kept apart from the pixel data it describes.
///
/// Layers are threaded alongside frames to a [`Display`] which decides how
/// (and whether) to draw them; frames themselves are never modified.
///
/// [`Display`]: crate::video::domain::display::Display
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnnotationLayer {
    annotations: Vec<Annotation>,
}

impl AnnotationLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn text(&mut self, text: impl Into<String>, at: Point, color: Color, background: Option<Color>) {
        self.push(Annotation::Text {
            text: text.into(),
            at,
            color,
            background,
        });
    }

    pub fn rect(&mut self, rect: Rect, color: Color, filled: bool) {
        self.push(Annotation::Rect {
            rect,
            color,
            filled,
        });
    }

    pub fn polygon(&mut self, points: Vec<Point>, color: Color, filled: bool) {
        self.push(Annotation::Polygon {
            points,
            color,
            filled,
        });
    }

    /// Appends every annotation from `other`, translated by (`dx`, `dy`).
    pub fn extend_offset(&mut self, other: &AnnotationLayer, dx: i32, dy: i32) {
        self.annotations
            .extend(other.annotations.iter().map(|a| a.translated(dx, dy)));
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Annotation {
    fn translated(&self, dx: i32, dy: i32) -> Annotation {
        let shift = |p: &Point| Point::new(p.x + dx, p.y + dy);
        match self {
            Annotation::Point { at, color } => Annotation::Point {
                at: shift(at),
                color: *color,
            },
            Annotation::Line { from, to, color } => Annotation::Line {
                from: shift(from),
                to: shift(to),
                color: *color,
            },
            Annotation::Rect {
                rect,
                color,
                filled,
            } => Annotation::Rect {
                rect: Rect::new(rect.x + dx, rect.y + dy, rect.width, rect.height),
                color: *color,
                filled: *filled,
            },
            Annotation::Circle {
                center,
                radius,
                color,
            } => Annotation::Circle {
                center: shift(center),
                radius: *radius,
                color: *color,
            },
            Annotation::Polygon {
                points,
                color,
                filled,
            } => Annotation::Polygon {
                points: points.iter().map(shift).collect(),
                color: *color,
                filled: *filled,
            },
            Annotation::Text {
                text,
                at,
                color,
                background,
            } => Annotation::Text {
                text: text.clone(),
                at: shift(at),
                color: *color,
                background: *background,
            },
        }
    }
}
