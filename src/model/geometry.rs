//! Geometry for drawn regions.
//!
//! Shapes are drawn on screen as arbitrary point lists; only their
//! axis-aligned bounding rectangle is ever persisted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MIN_BOX_COORDINATE;

/// Errors raised when deriving a box from a point list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The shape has no points, so it has no extent.
    #[error("cannot compute a bounding box from zero points")]
    Empty,

    /// A point coordinate is NaN or infinite.
    #[error("point {index} has a non-finite coordinate ({x}, {y})")]
    NonFinite {
        /// Position of the offending point in the list
        index: usize,
        /// X coordinate
        x: f64,
        /// Y coordinate
        y: f64,
    },
}

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// An integer, axis-aligned bounding box in the persisted corner form.
///
/// Invariant: `xmin <= xmax`, `ymin <= ymax`, `xmin >= 1` and `ymin >= 1`
/// for every box produced by [`points_to_bounding_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

impl BoundingBox {
    pub fn new(xmin: i64, ymin: i64, xmax: i64, ymax: i64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> i64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i64 {
        self.ymax - self.ymin
    }

    /// The four corners, clockwise from the top-left.
    ///
    /// This is the shape a box loaded from a label file is drawn with.
    pub fn corners(&self) -> Vec<Point> {
        let (x0, y0) = (self.xmin as f64, self.ymin as f64);
        let (x1, y1) = (self.xmax as f64, self.ymax as f64);
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    /// Whether the box touches an edge of a `width` x `height` image.
    ///
    /// Height-edge checks run before width-edge checks.
    pub fn touches_image_edge(&self, width: u32, height: u32) -> bool {
        if self.ymax == i64::from(height) || self.ymin == MIN_BOX_COORDINATE {
            return true;
        }
        self.xmax == i64::from(width) || self.xmin == MIN_BOX_COORDINATE
    }
}

/// Reduce a point list to its normalized bounding box.
///
/// Minimums below 1 are raised to 1 and maximums are kept at or above
/// their minimum. Fractional coordinates truncate toward zero.
pub fn points_to_bounding_box(points: &[Point]) -> Result<BoundingBox, GeometryError> {
    if points.is_empty() {
        return Err(GeometryError::Empty);
    }

    let mut xmin = f64::INFINITY;
    let mut ymin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymax = f64::NEG_INFINITY;

    for (index, p) in points.iter().enumerate() {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(GeometryError::NonFinite {
                index,
                x: p.x,
                y: p.y,
            });
        }
        xmin = xmin.min(p.x);
        ymin = ymin.min(p.y);
        xmax = xmax.max(p.x);
        ymax = ymax.max(p.y);
    }

    let min = MIN_BOX_COORDINATE as f64;
    let xmin = xmin.max(min) as i64;
    let ymin = ymin.max(min) as i64;
    let xmax = (xmax as i64).max(xmin);
    let ymax = (ymax as i64).max(ymin);

    Ok(BoundingBox::new(xmin, ymin, xmax, ymax))
}
