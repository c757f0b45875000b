//! Normalized geometry primitives.
//!
//! All coordinates live in the unit square: `(0, 0)` is the top-left corner of
//! the image and `(1, 1)` the bottom-right one.

use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};

/// A 2D point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Return this point with both coordinates clamped into the unit square.
    pub fn clamped(self) -> Self {
        Self::new(clamp_unit(self.x), clamp_unit(self.y))
    }
}

/// An axis-aligned box with `ymin <= ymax` and `xmin <= xmax`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ymin: f32,
    pub xmin: f32,
    pub ymax: f32,
    pub xmax: f32,
}

impl BoundingBox {
    /// Create a box from its edges. Edges are reordered if given inverted.
    pub fn new(ymin: f32, xmin: f32, ymax: f32, xmax: f32) -> Self {
        Self {
            ymin: ymin.min(ymax),
            xmin: xmin.min(xmax),
            ymax: ymin.max(ymax),
            xmax: xmin.max(xmax),
        }
    }

    /// Square of half side `radius` centered on `center`, clamped to the unit square.
    pub fn point_square(center: Point, radius: f32) -> Self {
        Self::new(
            center.y - radius,
            center.x - radius,
            center.y + radius,
            center.x + radius,
        )
        .clamped()
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Get the center point of the box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// Return this box with every edge clamped into [0, 1].
    pub fn clamped(self) -> Self {
        Self::new(
            clamp_unit(self.ymin),
            clamp_unit(self.xmin),
            clamp_unit(self.ymax),
            clamp_unit(self.xmax),
        )
    }

    /// Check if a point lies inside the closed rectangle.
    pub fn contains(&self, point: &Point) -> bool {
        hit_test(self, point)
    }
}

/// Clamp a scalar into [0, 1]. NaN maps to 0.
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Axis-aligned box enclosing a non-empty point sequence.
pub fn box_from_points(points: &[Point]) -> Result<BoundingBox> {
    let first = points
        .first()
        .ok_or_else(|| AnnotatorError::invalid_geometry("empty point sequence"))?;

    let mut bbox = BoundingBox::new(first.y, first.x, first.y, first.x);
    for p in &points[1..] {
        bbox.xmin = bbox.xmin.min(p.x);
        bbox.ymin = bbox.ymin.min(p.y);
        bbox.xmax = bbox.xmax.max(p.x);
        bbox.ymax = bbox.ymax.max(p.y);
    }
    Ok(bbox)
}

/// Box spanned by two arbitrary corners, independent of their order.
pub fn normalize_box(p1: Point, p2: Point) -> BoundingBox {
    BoundingBox {
        ymin: p1.y.min(p2.y),
        xmin: p1.x.min(p2.x),
        ymax: p1.y.max(p2.y),
        xmax: p1.x.max(p2.x),
    }
}

/// True if either side of the box is shorter than `min_side`.
pub fn is_degenerate(bbox: &BoundingBox, min_side: f32) -> bool {
    bbox.width() < min_side || bbox.height() < min_side
}

/// Closed-rectangle containment.
///
/// Polygons are hit-tested through their bounding box as well; overlay
/// selection only ever uses box proxies.
pub fn hit_test(bbox: &BoundingBox, point: &Point) -> bool {
    point.x >= bbox.xmin && point.x <= bbox.xmax && point.y >= bbox.ymin && point.y <= bbox.ymax
}
