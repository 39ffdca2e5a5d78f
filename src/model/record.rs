//! One drawn face box with its label and attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::attribute::{AttributeValue, FaceAttributes};
use super::geometry::{BoundingBox, GeometryError, Point, points_to_bounding_box};
use crate::constants::{DEFAULT_FILL_COLOR, DEFAULT_LINE_COLOR};

/// Opaque identity of a record inside a document.
pub type RecordId = u64;

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Default outline color for boxes.
    pub const fn default_line() -> Self {
        let [r, g, b, a] = DEFAULT_LINE_COLOR;
        Self::rgba(r, g, b, a)
    }

    /// Default fill color for boxes.
    pub const fn default_fill() -> Self {
        let [r, g, b, a] = DEFAULT_FILL_COLOR;
        Self::rgba(r, g, b, a)
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Color> for [u8; 4] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

/// A labelled face box.
///
/// `points` is whatever the user drew; only its bounding rectangle is
/// persisted. A `None` color means "use the document default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub label: String,
    pub points: Vec<Point>,
    #[serde(default)]
    pub line_color: Option<Color>,
    #[serde(default)]
    pub fill_color: Option<Color>,
    #[serde(default)]
    pub attributes: FaceAttributes,
}

impl AnnotationRecord {
    /// Create a record whose attributes start from `defaults`.
    pub fn new(label: impl Into<String>, points: Vec<Point>, defaults: &FaceAttributes) -> Self {
        Self {
            label: label.into(),
            points,
            line_color: None,
            fill_color: None,
            attributes: *defaults,
        }
    }

    /// Create a record drawn as the four corners of `bbox`.
    pub fn from_box(
        label: impl Into<String>,
        bbox: BoundingBox,
        attributes: FaceAttributes,
    ) -> Self {
        Self::new(label, bbox.corners(), &attributes)
    }

    pub fn with_line_color(mut self, color: Color) -> Self {
        self.line_color = Some(color);
        self
    }

    pub fn with_fill_color(mut self, color: Color) -> Self {
        self.fill_color = Some(color);
        self
    }

    /// Override the outline color; `None` falls back to the document default.
    pub fn set_line_color(&mut self, color: Option<Color>) {
        self.line_color = color;
    }

    pub fn set_fill_color(&mut self, color: Option<Color>) {
        self.fill_color = color;
    }

    /// Set or clear one attribute member. See [`FaceAttributes::set`].
    pub fn set_attribute(
        &mut self,
        value: AttributeValue,
        selected: bool,
    ) -> Option<AttributeValue> {
        self.attributes.set(value, selected)
    }

    /// Bounding box of the current points.
    pub fn bounding_box(&self) -> Result<BoundingBox, GeometryError> {
        points_to_bounding_box(&self.points)
    }

    /// Move every point by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// Flat key/value export of the record.
    ///
    /// Keys: `label`, `points`, `xmin`/`ymin`/`xmax`/`ymax`, one boolean per
    /// attribute member flag, and `line_color`/`fill_color`. A color equal
    /// to the document default (or unset) is exported as `null`.
    pub fn to_serializable_form(
        &self,
        default_line: Color,
        default_fill: Color,
    ) -> Result<Map<String, Value>, GeometryError> {
        let bbox = self.bounding_box()?;
        let mut form = Map::new();

        form.insert("label".into(), Value::String(self.label.clone()));
        form.insert(
            "points".into(),
            Value::Array(self.points.iter().map(|p| json!([p.x, p.y])).collect()),
        );
        form.insert("xmin".into(), json!(bbox.xmin));
        form.insert("ymin".into(), json!(bbox.ymin));
        form.insert("xmax".into(), json!(bbox.xmax));
        form.insert("ymax".into(), json!(bbox.ymax));

        form.insert(
            "line_color".into(),
            color_or_null(self.line_color, default_line),
        );
        form.insert(
            "fill_color".into(),
            color_or_null(self.fill_color, default_fill),
        );

        for (flag, on) in self.attributes.flags() {
            form.insert(flag.into(), Value::Bool(on));
        }

        Ok(form)
    }
}

fn color_or_null(color: Option<Color>, default: Color) -> Value {
    match color {
        Some(c) if c != default => json!(<[u8; 4]>::from(c)),
        _ => Value::Null,
    }
}
