//! Conversion of raw detector output into canonical annotations.
//!
//! This is the only place where partial detection records are validated and
//! defaulted; the store only ever receives fully populated [`Annotation`]s.

use super::raw::{RawDetection, parse_payload};
use crate::config::DetectionSettings;
use crate::constants::{
    DEFAULT_DEPTH_LAYER, DEFAULT_SCALE_DIVISOR, DEPTH_LAYER_MAX, DEPTH_LAYER_MIN, FRAME_MAX, FRAME_MIN,
    MIN_POLYGON_VERTICES, ORIENTATION_UNAVAILABLE, POINT_BOX_RADIUS, SPATIAL_CONTEXT_UNAVAILABLE,
};
use crate::error::{AnnotatorError, Result};
use crate::model::geometry::{box_from_points, clamp_unit};
use crate::model::{Annotation, BoundingBox, Point, ShapeKind, generate_id};

/// Normalizes detector records for one coordinate scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionNormalizer {
    /// Detector coordinates are divided by this to reach [0, 1]
    pub scale_divisor: f32,
    /// Confidence assumed for records without one
    pub default_confidence: f32,
}

impl Default for DetectionNormalizer {
    fn default() -> Self {
        Self::from_settings(&DetectionSettings::default())
    }
}

impl DetectionNormalizer {
    /// A non-positive or NaN divisor falls back to the 0-1000 grid.
    pub fn new(scale_divisor: f32, default_confidence: f32) -> Self {
        let scale_divisor = if scale_divisor.is_nan() || scale_divisor <= 0.0 {
            log::warn!("Invalid scale divisor {}, using {}", scale_divisor, DEFAULT_SCALE_DIVISOR);
            DEFAULT_SCALE_DIVISOR
        } else {
            scale_divisor
        };
        Self {
            scale_divisor,
            default_confidence,
        }
    }

    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self::new(settings.scale_divisor, settings.default_confidence)
    }

    /// Normalize a batch of records for `concept_id`.
    ///
    /// Records without a usable box are skipped. Ids are unique within the
    /// batch.
    pub fn normalize(&self, raw: &[RawDetection], concept_id: &str) -> Vec<Annotation> {
        let annotations: Vec<Annotation> = raw
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                match self.normalize_record(record, concept_id, index as u64) {
                    Ok(annotation) => Some(annotation),
                    Err(e) => {
                        log::warn!("Dropping detection {} for '{}': {}", index, concept_id, e);
                        None
                    }
                }
            })
            .collect();

        log::debug!(
            "Normalized {}/{} detections for '{}'",
            annotations.len(),
            raw.len(),
            concept_id
        );
        annotations
    }

    /// Normalize untyped backend text. Absent, empty or unparsable payloads
    /// yield an empty batch.
    pub fn normalize_payload(&self, payload: Option<&str>, concept_id: &str) -> Vec<Annotation> {
        let Some(text) = payload else {
            return Vec::new();
        };
        match parse_payload(text) {
            Ok(records) => self.normalize(&records, concept_id),
            Err(e) => {
                log::warn!("Ignoring detection payload for '{}': {}", concept_id, e);
                Vec::new()
            }
        }
    }

    fn normalize_record(
        &self,
        record: &RawDetection,
        concept_id: &str,
        index: u64,
    ) -> Result<Annotation> {
        let bounding_box = self.scaled_box(record.box_2d.as_deref())?;
        let requested = record
            .shape
            .as_deref()
            .and_then(ShapeKind::from_name)
            .unwrap_or_default();
        let points = self.scaled_points(record.points.as_deref());
        let (shape_kind, bounding_box, vertices) = resolve_shape(requested, bounding_box, points);

        let (frame_start, frame_end) = frame_range(record.frame_start, record.frame_end);

        Ok(Annotation {
            id: generate_id(concept_id, index),
            concept_id: concept_id.to_string(),
            shape_kind,
            bounding_box,
            vertices,
            confidence: clamp_unit(record.confidence.unwrap_or(self.default_confidence)),
            is_verified: false,
            is_masklet: record.is_masklet.unwrap_or(false),
            frame_start,
            frame_end,
            spatial_context: record
                .spatial_context
                .clone()
                .unwrap_or_else(|| SPATIAL_CONTEXT_UNAVAILABLE.to_string()),
            depth_layer: record
                .estimated_depth
                .map(depth_layer)
                .unwrap_or(DEFAULT_DEPTH_LAYER),
            orientation: record
                .orientation
                .clone()
                .unwrap_or_else(|| ORIENTATION_UNAVAILABLE.to_string()),
        })
    }

    /// Map `[ymin, xmin, ymax, xmax]` into a unit-square box.
    fn scaled_box(&self, box_2d: Option<&[f32]>) -> Result<BoundingBox> {
        let coords = box_2d.ok_or_else(|| AnnotatorError::invalid_geometry("missing box_2d"))?;
        let [ymin, xmin, ymax, xmax] = <[f32; 4]>::try_from(coords).map_err(|_| {
            AnnotatorError::invalid_geometry(format!(
                "box_2d needs 4 coordinates, got {}",
                coords.len()
            ))
        })?;
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(AnnotatorError::invalid_geometry("non-finite box coordinate"));
        }

        let s = self.scale_divisor;
        Ok(BoundingBox::new(ymin / s, xmin / s, ymax / s, xmax / s).clamped())
    }

    /// Map `[y, x]` pairs into unit-square points, dropping non-finite ones.
    fn scaled_points(&self, points: Option<&[[f32; 2]]>) -> Vec<Point> {
        let s = self.scale_divisor;
        points
            .unwrap_or_default()
            .iter()
            .filter(|[y, x]| y.is_finite() && x.is_finite())
            .map(|[y, x]| Point::new(x / s, y / s).clamped())
            .collect()
    }
}

/// Decide the final shape. Polygons without enough points fall back to a box;
/// points without coordinates use the box center.
fn resolve_shape(
    requested: ShapeKind,
    bbox: BoundingBox,
    points: Vec<Point>,
) -> (ShapeKind, BoundingBox, Vec<Point>) {
    match requested {
        ShapeKind::Box => (ShapeKind::Box, bbox, Vec::new()),
        ShapeKind::Polygon if points.len() >= MIN_POLYGON_VERTICES => {
            match box_from_points(&points) {
                Ok(derived) => (ShapeKind::Polygon, derived, points),
                Err(_) => (ShapeKind::Box, bbox, Vec::new()),
            }
        }
        ShapeKind::Polygon => {
            log::debug!(
                "Polygon detection with {} points degraded to a box",
                points.len()
            );
            (ShapeKind::Box, bbox, Vec::new())
        }
        ShapeKind::Point => {
            let at = points.first().copied().unwrap_or_else(|| bbox.center());
            (
                ShapeKind::Point,
                BoundingBox::point_square(at, POINT_BOX_RADIUS),
                vec![at],
            )
        }
    }
}

fn frame_range(start: Option<f32>, end: Option<f32>) -> (f32, f32) {
    let clamp = |v: f32| if v.is_nan() { FRAME_MIN } else { v.clamp(FRAME_MIN, FRAME_MAX) };
    let start = clamp(start.unwrap_or(FRAME_MIN));
    let end = clamp(end.unwrap_or(FRAME_MAX));
    (start.min(end), start.max(end))
}

fn depth_layer(estimated: f32) -> u8 {
    if estimated.is_nan() {
        return DEFAULT_DEPTH_LAYER;
    }
    estimated
        .round()
        .clamp(f32::from(DEPTH_LAYER_MIN), f32::from(DEPTH_LAYER_MAX)) as u8
}
