//! Global policy constants for the annotation core

/// Side length below which a drawn box is treated as an accidental micro-drag
pub const MIN_BOX_SIDE: f32 = 0.01;

/// Half side of the synthetic square around a point annotation
pub const POINT_BOX_RADIUS: f32 = 0.01;

/// Minimum number of vertices required to close a polygon
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Distance under which a repeated polygon click is ignored
pub const VERTEX_DEDUP_EPSILON: f32 = 1e-6;

/// Divisor for detector boxes reported on a 0-1000 grid
pub const DEFAULT_SCALE_DIVISOR: f32 = 1000.0;

/// Confidence assumed when a detection omits one
pub const DEFAULT_DETECTION_CONFIDENCE: f32 = 0.85;

/// Confidence of a human-drawn shape
pub const MANUAL_CONFIDENCE: f32 = 1.0;

/// Optimistic presence prior before the first detection batch arrives
pub const PRESENCE_PRIOR: f32 = 0.92;

/// Presence score of a concept whose detection returned nothing
pub const PRESENCE_FLOOR: f32 = 0.1;

/// Depth layer bounds and default
pub const DEPTH_LAYER_MIN: u8 = 0;
pub const DEPTH_LAYER_MAX: u8 = 10;
pub const DEFAULT_DEPTH_LAYER: u8 = 5;

/// Synthetic timeline bounds
pub const FRAME_MIN: f32 = 0.0;
pub const FRAME_MAX: f32 = 100.0;

/// Default playback speed in timeline units per second
pub const DEFAULT_PLAYBACK_SPEED: f32 = 10.0;

/// Sentinel texts for missing spatial reasoning fields
pub const SPATIAL_CONTEXT_UNAVAILABLE: &str = "Spatial analysis unavailable";
pub const ORIENTATION_UNAVAILABLE: &str = "Orientation unavailable";

/// Orientation recorded for hand-drawn shapes
pub const ORIENTATION_UNKNOWN: &str = "Unknown";

/// Spatial context recorded for hand-drawn shapes
pub const MANUAL_SPATIAL_CONTEXT: &str = "Manually annotated";

/// Concept color palette, assigned round-robin by creation order
pub const CONCEPT_PALETTE: [[u8; 3]; 8] = [
    [59, 130, 246],
    [239, 68, 68],
    [16, 185, 129],
    [245, 158, 11],
    [139, 92, 246],
    [236, 72, 153],
    [6, 182, 212],
    [132, 204, 22],
];
