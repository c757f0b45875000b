//! Annotation data model.

use serde::{Deserialize, Serialize};

use super::concept::ConceptId;
use super::geometry::{BoundingBox, Point, box_from_points, clamp_unit};
use crate::constants::{
    DEFAULT_DEPTH_LAYER, FRAME_MAX, FRAME_MIN, MANUAL_SPATIAL_CONTEXT, MIN_POLYGON_VERTICES,
    ORIENTATION_UNKNOWN,
};
use crate::error::{AnnotatorError, Result};

/// Unique identifier for an annotation.
pub type AnnotationId = String;

/// Geometric kind of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned box
    #[default]
    Box,
    /// Closed polygon, hit-tested through its bounding box
    Polygon,
    /// Single point with a small synthetic bounding box
    Point,
}

impl ShapeKind {
    /// Parse a loosely spelled shape name from detector output.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "box" | "bbox" | "bounding_box" | "rectangle" => Some(ShapeKind::Box),
            "polygon" | "poly" | "mask" => Some(ShapeKind::Polygon),
            "point" | "keypoint" => Some(ShapeKind::Point),
            _ => None,
        }
    }

    /// Get the display name for this shape kind.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "Box",
            ShapeKind::Polygon => "Polygon",
            ShapeKind::Point => "Point",
        }
    }
}

/// A detected or hand-drawn region in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    /// Owning concept, by value. Re-resolved through the store on every lookup.
    pub concept_id: ConceptId,
    pub shape_kind: ShapeKind,
    pub bounding_box: BoundingBox,
    /// Empty for boxes, exactly one entry for points, three or more for polygons.
    pub vertices: Vec<Point>,
    pub confidence: f32,
    pub is_verified: bool,
    /// Solid-fill rendering hint
    pub is_masklet: bool,
    pub frame_start: f32,
    pub frame_end: f32,
    pub spatial_context: String,
    pub depth_layer: u8,
    pub orientation: String,
}

impl Annotation {
    /// True if the annotation's temporal extent covers `frame`.
    pub fn is_active_at(&self, frame: f32) -> bool {
        frame >= self.frame_start && frame <= self.frame_end
    }
}

/// Geometry of a shape produced by a drawing gesture, before the store
/// assigns identity and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftShape {
    pub kind: ShapeKind,
    pub bounding_box: BoundingBox,
    pub vertices: Vec<Point>,
}

impl DraftShape {
    /// A box shape. Edges are clamped into the unit square.
    pub fn boxed(bbox: BoundingBox) -> Self {
        Self {
            kind: ShapeKind::Box,
            bounding_box: bbox.clamped(),
            vertices: Vec::new(),
        }
    }

    /// A closed polygon. Fails if fewer than three vertices are given.
    pub fn polygon(vertices: Vec<Point>) -> Result<Self> {
        if vertices.len() < MIN_POLYGON_VERTICES {
            return Err(AnnotatorError::invalid_geometry(format!(
                "polygon needs at least {} vertices, got {}",
                MIN_POLYGON_VERTICES,
                vertices.len()
            )));
        }
        let vertices: Vec<Point> = vertices.into_iter().map(Point::clamped).collect();
        let bounding_box = box_from_points(&vertices)?;
        Ok(Self {
            kind: ShapeKind::Polygon,
            bounding_box,
            vertices,
        })
    }

    /// A point marker with a square of half side `radius` around it.
    pub fn point(at: Point, radius: f32) -> Self {
        let at = at.clamped();
        Self {
            kind: ShapeKind::Point,
            bounding_box: BoundingBox::point_square(at, radius),
            vertices: vec![at],
        }
    }

    /// Turn the draft into a verified, human-drawn annotation.
    pub(crate) fn into_annotation(
        self,
        id: AnnotationId,
        concept_id: ConceptId,
        confidence: f32,
    ) -> Annotation {
        Annotation {
            id,
            concept_id,
            shape_kind: self.kind,
            bounding_box: self.bounding_box,
            vertices: self.vertices,
            confidence: clamp_unit(confidence),
            is_verified: true,
            is_masklet: false,
            frame_start: FRAME_MIN,
            frame_end: FRAME_MAX,
            spatial_context: MANUAL_SPATIAL_CONTEXT.to_string(),
            depth_layer: DEFAULT_DEPTH_LAYER,
            orientation: ORIENTATION_UNKNOWN.to_string(),
        }
    }
}

/// Milliseconds since the Unix epoch, or 0 if the clock is unavailable.
pub(crate) fn unix_millis() -> u128 {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Build an annotation id from a prefix, the current time and a sequence number.
pub(crate) fn generate_id(prefix: &str, seq: u64) -> AnnotationId {
    format!("{}-{}-{}", prefix, unix_millis(), seq)
}
