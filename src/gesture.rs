//! Drawing gestures.
//!
//! The [`GestureController`] is a per-tool state machine turning pointer
//! events into committed annotations. It never keeps a partial shape in the
//! store: an in-progress shape lives only in [`DrawingState`] until it is
//! committed or discarded.

use crate::config::DrawingSettings;
use crate::constants::VERTEX_DEDUP_EPSILON;
use crate::model::geometry::{is_degenerate, normalize_box};
use crate::model::{AnnotationId, BoundingBox, ConceptId, DraftShape, Point};
use crate::store::AnnotationStore;

/// Annotation tools available on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationTool {
    /// Selection tool for hovering and reviewing existing annotations
    #[default]
    Select,
    /// Bounding box annotation tool
    Box,
    /// Polygon annotation tool
    Polygon,
    /// Point annotation tool
    Point,
}

impl AnnotationTool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationTool::Select => "Select",
            AnnotationTool::Box => "Box",
            AnnotationTool::Polygon => "Polygon",
            AnnotationTool::Point => "Point",
        }
    }

    /// Check if this tool is a drawing tool (not Select).
    pub fn is_drawing_tool(&self) -> bool {
        !matches!(self, AnnotationTool::Select)
    }
}

/// State for an annotation currently being drawn.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DrawingState {
    /// Not currently drawing anything.
    #[default]
    Idle,
    /// Dragging a box from `start` to the live `current` corner.
    Box { start: Point, current: Point },
    /// Collecting polygon vertices.
    Polygon { vertices: Vec<Point> },
}

impl DrawingState {
    /// Check if we're currently drawing something.
    pub fn is_drawing(&self) -> bool {
        !matches!(self, DrawingState::Idle)
    }
}

/// In-progress shape for the render layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Box(BoundingBox),
    /// Open polyline through the vertices placed so far
    Polyline(Vec<Point>),
}

/// What a pointer event did.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// The event had no effect
    Ignored,
    /// The select tool is active; the event belongs to the overlay resolver
    PassThrough,
    /// The in-progress shape changed
    Updated,
    /// A shape was added to the store
    Committed(AnnotationId),
    /// The gesture ended without adding anything
    Discarded,
}

/// Per-tool drawing state machine.
#[derive(Debug, Clone)]
pub struct GestureController {
    tool: AnnotationTool,
    active_concept: Option<ConceptId>,
    state: DrawingState,
    settings: DrawingSettings,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(DrawingSettings::default())
    }
}

impl GestureController {
    pub fn new(settings: DrawingSettings) -> Self {
        Self {
            tool: AnnotationTool::default(),
            active_concept: None,
            state: DrawingState::Idle,
            settings,
        }
    }

    pub fn tool(&self) -> AnnotationTool {
        self.tool
    }

    pub fn active_concept(&self) -> Option<&str> {
        self.active_concept.as_deref()
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        self.state.is_drawing()
    }

    /// Switch tools, discarding any in-progress shape.
    pub fn set_tool(&mut self, tool: AnnotationTool) {
        if tool != self.tool {
            self.cancel();
            log::debug!("Tool: {} -> {}", self.tool.name(), tool.name());
            self.tool = tool;
        }
    }

    /// Change the concept new shapes are attached to. Changing or clearing it
    /// discards any in-progress shape.
    pub fn set_active_concept(&mut self, concept_id: Option<ConceptId>) {
        if concept_id != self.active_concept {
            self.cancel();
            log::debug!("Active concept: {:?}", concept_id);
            self.active_concept = concept_id;
        }
    }

    /// Discard the in-progress shape. Returns true if one existed.
    pub fn cancel(&mut self) -> bool {
        let was_drawing = self.state.is_drawing();
        if was_drawing {
            log::debug!("Discarding in-progress {} shape", self.tool.name());
        }
        self.state = DrawingState::Idle;
        was_drawing
    }

    /// Shape to draw as a live preview, if any.
    pub fn preview(&self) -> Option<Preview> {
        match &self.state {
            DrawingState::Idle => None,
            DrawingState::Box { start, current } => {
                Some(Preview::Box(normalize_box(*start, *current)))
            }
            DrawingState::Polygon { vertices } => Some(Preview::Polyline(vertices.clone())),
        }
    }

    pub fn pointer_down(&mut self, store: &mut AnnotationStore, point: Point) -> GestureOutcome {
        let point = point.clamped();
        if self.tool == AnnotationTool::Select {
            return GestureOutcome::PassThrough;
        }
        let Some(concept_id) = self.active_concept.clone() else {
            log::debug!("{}: pointer down without an active concept", self.tool.name());
            return GestureOutcome::Ignored;
        };

        match self.tool {
            AnnotationTool::Select => GestureOutcome::PassThrough,
            AnnotationTool::Box => {
                self.state = DrawingState::Box {
                    start: point,
                    current: point,
                };
                log::debug!("Box: started at ({:.3}, {:.3})", point.x, point.y);
                GestureOutcome::Updated
            }
            AnnotationTool::Point => {
                let draft = DraftShape::point(point, self.settings.point_box_radius);
                commit(store, &concept_id, draft)
            }
            AnnotationTool::Polygon => self.add_vertex(point),
        }
    }

    pub fn pointer_move(&mut self, point: Point) -> GestureOutcome {
        if self.tool == AnnotationTool::Select {
            return GestureOutcome::PassThrough;
        }
        match &mut self.state {
            DrawingState::Box { current, .. } => {
                *current = point.clamped();
                GestureOutcome::Updated
            }
            _ => GestureOutcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, store: &mut AnnotationStore, point: Point) -> GestureOutcome {
        if self.tool == AnnotationTool::Select {
            return GestureOutcome::PassThrough;
        }
        let DrawingState::Box { start, .. } = self.state else {
            return GestureOutcome::Ignored;
        };
        // Back to idle whether or not the box is kept
        self.state = DrawingState::Idle;

        let bbox = normalize_box(start, point.clamped());
        if is_degenerate(&bbox, self.settings.min_box_side) {
            log::debug!(
                "Box: discarded degenerate {:.4}x{:.4} box",
                bbox.width(),
                bbox.height()
            );
            return GestureOutcome::Discarded;
        }
        match self.active_concept.clone() {
            Some(concept_id) => commit(store, &concept_id, DraftShape::boxed(bbox)),
            None => GestureOutcome::Discarded,
        }
    }

    /// Close the polygon being drawn. Needs at least three vertices; with
    /// fewer the polygon stays open.
    pub fn double_click(&mut self, store: &mut AnnotationStore) -> GestureOutcome {
        if self.tool == AnnotationTool::Select {
            return GestureOutcome::PassThrough;
        }
        let DrawingState::Polygon { vertices } = &self.state else {
            return GestureOutcome::Ignored;
        };
        let draft = match DraftShape::polygon(vertices.clone()) {
            Ok(draft) => draft,
            Err(e) => {
                log::debug!("Polygon: not closed: {}", e);
                return GestureOutcome::Ignored;
            }
        };
        self.state = DrawingState::Idle;

        match self.active_concept.clone() {
            Some(concept_id) => commit(store, &concept_id, draft),
            None => GestureOutcome::Discarded,
        }
    }

    fn add_vertex(&mut self, point: Point) -> GestureOutcome {
        match &mut self.state {
            DrawingState::Polygon { vertices } => {
                if vertices
                    .last()
                    .is_some_and(|last| last.distance_to(&point) < VERTEX_DEDUP_EPSILON)
                {
                    return GestureOutcome::Ignored;
                }
                vertices.push(point);
                log::debug!(
                    "Polygon: added vertex {} at ({:.3}, {:.3})",
                    vertices.len(),
                    point.x,
                    point.y
                );
            }
            _ => {
                self.state = DrawingState::Polygon {
                    vertices: vec![point],
                };
                log::debug!("Polygon: started at ({:.3}, {:.3})", point.x, point.y);
            }
        }
        GestureOutcome::Updated
    }
}

fn commit(store: &mut AnnotationStore, concept_id: &str, draft: DraftShape) -> GestureOutcome {
    match store.add_single_annotation(concept_id, draft) {
        Some(id) => GestureOutcome::Committed(id),
        None => GestureOutcome::Discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShapeKind;

    const EPS: f32 = 1e-6;

    fn setup(tool: AnnotationTool) -> (AnnotationStore, GestureController) {
        let mut store = AnnotationStore::default();
        store.add_concept("car");
        let mut controller = GestureController::default();
        controller.set_tool(tool);
        controller.set_active_concept(Some("car".to_string()));
        (store, controller)
    }

    fn committed(outcome: GestureOutcome) -> AnnotationId {
        match outcome {
            GestureOutcome::Committed(id) => id,
            other => panic!("Expected a commit, got {:?}", other),
        }
    }

    #[test]
    fn test_box_gesture_commits() {
        let (mut store, mut gc) = setup(AnnotationTool::Box);

        assert_eq!(gc.pointer_down(&mut store, Point::new(0.2, 0.2)), GestureOutcome::Updated);
        assert!(gc.is_drawing());
        gc.pointer_move(Point::new(0.4, 0.4));
        let id = committed(gc.pointer_up(&mut store, Point::new(0.5, 0.6)));
        assert!(!gc.is_drawing());

        let ann = store.annotation(&id).unwrap();
        assert_eq!(ann.shape_kind, ShapeKind::Box);
        assert!((ann.bounding_box.xmin - 0.2).abs() < EPS);
        assert!((ann.bounding_box.ymin - 0.2).abs() < EPS);
        assert!((ann.bounding_box.xmax - 0.5).abs() < EPS);
        assert!((ann.bounding_box.ymax - 0.6).abs() < EPS);
        assert_eq!(ann.confidence, 1.0);
        assert!(ann.is_verified);
        assert_eq!(store.concept("car").unwrap().instance_count, 1);
    }

    #[test]
    fn test_box_preview_follows_pointer() {
        let (mut store, mut gc) = setup(AnnotationTool::Box);
        gc.pointer_down(&mut store, Point::new(0.5, 0.5));
        gc.pointer_move(Point::new(0.3, 0.2));

        let Some(Preview::Box(bbox)) = gc.preview() else {
            panic!("Expected box preview");
        };
        assert_eq!(bbox, normalize_box(Point::new(0.3, 0.2), Point::new(0.5, 0.5)));
        // Previews are never committed
        assert!(store.annotations().is_empty());
    }

    #[test]
    fn test_degenerate_box_is_discarded() {
        let (mut store, mut gc) = setup(AnnotationTool::Box);
        gc.pointer_down(&mut store, Point::new(0.2, 0.2));
        let outcome = gc.pointer_up(&mut store, Point::new(0.205, 0.208));

        assert_eq!(outcome, GestureOutcome::Discarded);
        assert!(store.annotations().is_empty());
        assert!(!gc.is_drawing());
    }

    #[test]
    fn test_pointer_down_without_concept_is_noop() {
        let (mut store, mut gc) = setup(AnnotationTool::Box);
        gc.set_active_concept(None);

        assert_eq!(gc.pointer_down(&mut store, Point::new(0.2, 0.2)), GestureOutcome::Ignored);
        assert!(!gc.is_drawing());

        gc.set_tool(AnnotationTool::Point);
        assert_eq!(gc.pointer_down(&mut store, Point::new(0.2, 0.2)), GestureOutcome::Ignored);
        assert!(store.annotations().is_empty());
    }

    #[test]
    fn test_point_click_commits_immediately() {
        let (mut store, mut gc) = setup(AnnotationTool::Point);
        let id = committed(gc.pointer_down(&mut store, Point::new(0.4, 0.4)));
        assert!(!gc.is_drawing());

        let ann = store.annotation(&id).unwrap();
        assert_eq!(ann.shape_kind, ShapeKind::Point);
        assert_eq!(ann.vertices, vec![Point::new(0.4, 0.4)]);
        let center = ann.bounding_box.center();
        assert!((center.x - 0.4).abs() < EPS);
        assert!((center.y - 0.4).abs() < EPS);
        assert!((ann.bounding_box.width() - 0.02).abs() < 1e-5);
    }

    #[test]
    fn test_polygon_gesture_commits_on_double_click() {
        let (mut store, mut gc) = setup(AnnotationTool::Polygon);
        gc.pointer_down(&mut store, Point::new(0.1, 0.1));
        gc.pointer_down(&mut store, Point::new(0.3, 0.1));
        gc.pointer_down(&mut store, Point::new(0.2, 0.3));
        assert!(gc.is_drawing());

        let id = committed(gc.double_click(&mut store));
        assert!(!gc.is_drawing());

        let ann = store.annotation(&id).unwrap();
        assert_eq!(ann.shape_kind, ShapeKind::Polygon);
        assert_eq!(
            ann.vertices,
            vec![
                Point::new(0.1, 0.1),
                Point::new(0.3, 0.1),
                Point::new(0.2, 0.3)
            ]
        );
        assert!((ann.bounding_box.xmin - 0.1).abs() < EPS);
        assert!((ann.bounding_box.ymin - 0.1).abs() < EPS);
        assert!((ann.bounding_box.xmax - 0.3).abs() < EPS);
        assert!((ann.bounding_box.ymax - 0.3).abs() < EPS);
    }

    #[test]
    fn test_polygon_with_two_vertices_is_not_closed() {
        let (mut store, mut gc) = setup(AnnotationTool::Polygon);
        gc.pointer_down(&mut store, Point::new(0.1, 0.1));
        gc.pointer_down(&mut store, Point::new(0.3, 0.1));

        assert_eq!(gc.double_click(&mut store), GestureOutcome::Ignored);
        assert!(store.annotations().is_empty());
        // Still collecting vertices
        assert!(gc.is_drawing());
    }

    #[test]
    fn test_double_click_press_does_not_stack_vertices() {
        let (mut store, mut gc) = setup(AnnotationTool::Polygon);
        gc.pointer_down(&mut store, Point::new(0.1, 0.1));
        gc.pointer_down(&mut store, Point::new(0.3, 0.1));
        gc.pointer_down(&mut store, Point::new(0.2, 0.3));
        assert_eq!(gc.pointer_down(&mut store, Point::new(0.2, 0.3)), GestureOutcome::Ignored);

        let id = committed(gc.double_click(&mut store));
        assert_eq!(store.annotation(&id).unwrap().vertices.len(), 3);
    }

    #[test]
    fn test_switching_tool_discards_shape() {
        let (mut store, mut gc) = setup(AnnotationTool::Polygon);
        gc.pointer_down(&mut store, Point::new(0.1, 0.1));
        gc.pointer_down(&mut store, Point::new(0.3, 0.1));
        gc.pointer_down(&mut store, Point::new(0.2, 0.3));

        gc.set_tool(AnnotationTool::Box);
        assert!(!gc.is_drawing());
        assert!(gc.preview().is_none());
        assert_eq!(gc.double_click(&mut store), GestureOutcome::Ignored);
        assert!(store.annotations().is_empty());
    }

    #[test]
    fn test_deselecting_concept_discards_box() {
        let (mut store, mut gc) = setup(AnnotationTool::Box);
        gc.pointer_down(&mut store, Point::new(0.2, 0.2));
        gc.set_active_concept(None);

        assert!(!gc.is_drawing());
        assert_eq!(gc.pointer_up(&mut store, Point::new(0.6, 0.6)), GestureOutcome::Ignored);
        assert!(store.annotations().is_empty());
    }

    #[test]
    fn test_select_tool_passes_through() {
        let (mut store, mut gc) = setup(AnnotationTool::Select);
        assert_eq!(gc.pointer_down(&mut store, Point::new(0.2, 0.2)), GestureOutcome::PassThrough);
        assert_eq!(gc.pointer_move(Point::new(0.3, 0.3)), GestureOutcome::PassThrough);
        assert_eq!(gc.pointer_up(&mut store, Point::new(0.6, 0.6)), GestureOutcome::PassThrough);
        assert!(store.annotations().is_empty());
    }

    #[test]
    fn test_commit_to_deleted_concept_is_discarded() {
        let (mut store, mut gc) = setup(AnnotationTool::Box);
        gc.pointer_down(&mut store, Point::new(0.2, 0.2));
        store.delete_concept("car");

        assert_eq!(gc.pointer_up(&mut store, Point::new(0.6, 0.6)), GestureOutcome::Discarded);
        assert!(store.annotations().is_empty());
    }

    #[test]
    fn test_pointer_is_clamped() {
        let (mut store, mut gc) = setup(AnnotationTool::Box);
        gc.pointer_down(&mut store, Point::new(-0.5, 0.5));
        let id = committed(gc.pointer_up(&mut store, Point::new(1.5, 0.9)));

        let bbox = store.annotation(&id).unwrap().bounding_box;
        assert_eq!(bbox.xmin, 0.0);
        assert_eq!(bbox.xmax, 1.0);
    }
}
