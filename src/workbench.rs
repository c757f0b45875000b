//! Coordinating context for one annotation session.
//!
//! The [`Workbench`] owns the store and lends it to the gesture controller and
//! overlay resolver for each event. Pointer events in select mode go to the
//! resolver; in drawing modes they go to the controller.

use serde::Serialize;

use crate::config::WorkbenchConfig;
use crate::detection::{DetectionBackend, DetectionNormalizer, RawDetection, Simulator, detect_or_empty};
use crate::error::Result;
use crate::gesture::{AnnotationTool, GestureController, GestureOutcome};
use crate::model::{Annotation, Concept, ConceptId, Point, concept_id_from_name};
use crate::overlay::{Affordances, OverlayResolver};
use crate::store::{AnnotationStore, DetectionTicket};
use crate::timeline::PlaybackClock;

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchSnapshot<'a> {
    pub concepts: &'a [Concept],
    pub annotations: &'a [Annotation],
    pub is_processing: bool,
    pub active_concept: Option<&'a str>,
    pub hovered: Option<&'a str>,
    pub playhead: f32,
}

/// One annotation session.
pub struct Workbench {
    config: WorkbenchConfig,
    store: AnnotationStore,
    gestures: GestureController,
    overlay: OverlayResolver,
    normalizer: DetectionNormalizer,
    clock: PlaybackClock,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new(WorkbenchConfig::default())
    }
}

impl Workbench {
    pub fn new(config: WorkbenchConfig) -> Self {
        let config = config.sanitized();
        Self {
            store: AnnotationStore::new(&config),
            gestures: GestureController::new(config.drawing),
            overlay: OverlayResolver::new(),
            normalizer: DetectionNormalizer::from_settings(&config.detection),
            clock: PlaybackClock::new(config.playback),
            config,
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    pub fn overlay(&self) -> &OverlayResolver {
        &self.overlay
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut PlaybackClock {
        &mut self.clock
    }

    pub fn snapshot(&self) -> WorkbenchSnapshot<'_> {
        WorkbenchSnapshot {
            concepts: self.store.concepts(),
            annotations: self.store.annotations(),
            is_processing: self.store.is_processing(),
            active_concept: self.gestures.active_concept(),
            hovered: self.overlay.hovered(&self.store).map(|a| a.id.as_str()),
            playhead: self.clock.position(),
        }
    }

    // ========================================================================
    // Concepts and detection
    // ========================================================================

    /// Declare a concept and start a detection request for it.
    ///
    /// Returns `None` for duplicates (which are left untouched) and for empty
    /// names. The new concept becomes the active drawing concept.
    pub fn begin_detection(&mut self, name: &str) -> Option<DetectionTicket> {
        let id = concept_id_from_name(name);
        if self.store.concept(&id).is_some() {
            log::debug!("Concept '{}' already submitted", id);
            return None;
        }
        let id = self.store.add_concept(name)?;
        self.gestures.set_active_concept(Some(id.clone()));
        self.store.begin_detection(&id)
    }

    /// Apply a backend result. Failures degrade to an empty batch.
    pub fn finish_detection(
        &mut self,
        ticket: &DetectionTicket,
        result: Result<Vec<RawDetection>>,
    ) -> bool {
        let raw = result.unwrap_or_else(|e| {
            log::warn!("Detection for '{}' failed: {}", ticket.concept_id, e);
            Vec::new()
        });
        let batch = self.normalizer.normalize(&raw, &ticket.concept_id);
        self.store.complete_detection(ticket, batch)
    }

    /// Submit a concept and run detection synchronously through `backend`.
    pub fn submit_concept(
        &mut self,
        name: &str,
        backend: &mut dyn DetectionBackend,
        image_base64: &str,
    ) -> Option<ConceptId> {
        let ticket = self.begin_detection(name)?;
        let raw = detect_or_empty(backend, &ticket.concept_id, image_base64);
        self.finish_detection(&ticket, Ok(raw));
        Some(ticket.concept_id)
    }

    /// Submit a concept and fill it from the offline simulator.
    pub fn simulate_concept(&mut self, name: &str, simulator: &mut Simulator) -> Option<ConceptId> {
        let ticket = self.begin_detection(name)?;
        let batch = simulator.simulate(&ticket.concept_id, &self.normalizer);
        self.store.complete_detection(&ticket, batch);
        Some(ticket.concept_id)
    }

    pub fn toggle_visibility(&mut self, concept_id: &str) -> bool {
        self.store.toggle_visibility(concept_id)
    }

    /// Delete a concept and its annotations. Deactivates it if it was the
    /// drawing concept, which discards any in-progress shape.
    pub fn delete_concept(&mut self, concept_id: &str) -> Option<Concept> {
        if self.gestures.active_concept() == Some(concept_id) {
            self.gestures.set_active_concept(None);
        }
        self.store.delete_concept(concept_id)
    }

    // ========================================================================
    // Canvas events
    // ========================================================================

    pub fn set_tool(&mut self, tool: AnnotationTool) {
        self.gestures.set_tool(tool);
        if tool.is_drawing_tool() {
            self.overlay.clear_hover();
        }
    }

    /// Choose the concept new shapes attach to. Unknown ids are ignored.
    pub fn set_active_concept(&mut self, concept_id: Option<&str>) -> bool {
        match concept_id {
            Some(id) if self.store.concept(id).is_none() => {
                log::debug!("Cannot activate unknown concept '{}'", id);
                false
            }
            _ => {
                self.gestures
                    .set_active_concept(concept_id.map(str::to_string));
                true
            }
        }
    }

    pub fn pointer_down(&mut self, point: Point) -> GestureOutcome {
        let outcome = self.gestures.pointer_down(&mut self.store, point);
        if outcome == GestureOutcome::PassThrough {
            self.overlay.select_at(&self.store, point.clamped());
        }
        outcome
    }

    pub fn pointer_move(&mut self, point: Point) -> GestureOutcome {
        let outcome = self.gestures.pointer_move(point);
        if outcome == GestureOutcome::PassThrough {
            self.overlay.update_hover(&self.store, point.clamped());
        }
        outcome
    }

    pub fn pointer_up(&mut self, point: Point) -> GestureOutcome {
        self.gestures.pointer_up(&mut self.store, point)
    }

    pub fn double_click(&mut self) -> GestureOutcome {
        self.gestures.double_click(&mut self.store)
    }

    /// Discard the in-progress shape (escape key).
    pub fn cancel_gesture(&mut self) -> bool {
        self.gestures.cancel()
    }

    // ========================================================================
    // Review
    // ========================================================================

    /// Affordances for the hovered annotation.
    pub fn hovered_affordances(&self) -> Affordances {
        self.overlay
            .hovered(&self.store)
            .map(|a| OverlayResolver::affordances(&self.store, &a.id))
            .unwrap_or_default()
    }

    pub fn verify(&mut self, annotation_id: &str) -> bool {
        self.store.verify(annotation_id)
    }

    pub fn reject(&mut self, annotation_id: &str) -> Option<Annotation> {
        self.store.reject(annotation_id)
    }

    /// Verify the hovered annotation if verification is on offer.
    pub fn verify_hovered(&mut self) -> bool {
        let Some(id) = self.hovered_id() else {
            return false;
        };
        if !OverlayResolver::affordances(&self.store, &id).verify {
            return false;
        }
        self.store.verify(&id)
    }

    /// Reject the hovered annotation.
    pub fn reject_hovered(&mut self) -> Option<Annotation> {
        let id = self.hovered_id()?;
        let removed = self.store.reject(&id);
        self.overlay.clear_hover();
        removed
    }

    fn hovered_id(&self) -> Option<String> {
        self.overlay.hovered(&self.store).map(|a| a.id.clone())
    }

    /// Advance the playback clock.
    pub fn tick(&mut self, dt_seconds: f32) -> f32 {
        self.clock.tick(dt_seconds)
    }

    /// Renderable annotations active at the playhead.
    pub fn visible_at_playhead(&self) -> Vec<&Annotation> {
        let frame = self.clock.position();
        self.store
            .renderable_annotations()
            .filter(|a| a.is_active_at(frame))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulatorSettings;
    use crate::detection::TextResponseBackend;
    use crate::error::AnnotatorError;

    fn canned(payload: &'static str) -> impl DetectionBackend {
        TextResponseBackend::new("canned", move |_prompt: &str, _image: &str| {
            Ok(payload.to_string())
        })
    }

    #[test]
    fn test_submit_concept_through_backend() {
        let mut wb = Workbench::default();
        let mut backend = canned(
            r#"[{"box_2d": [100, 200, 400, 600], "confidence": 0.77},
                {"box_2d": [500, 500, 900, 900], "confidence": 0.57}]"#,
        );

        let id = wb.submit_concept("Red Car", &mut backend, "aGVsbG8=").unwrap();
        assert_eq!(id, "red-car");
        assert_eq!(wb.gestures().active_concept(), Some("red-car"));

        let concept = wb.store().concept("red-car").unwrap();
        assert_eq!(concept.instance_count, 2);
        assert!((concept.presence_score - 0.67).abs() < 1e-5);
        assert!(!wb.store().is_processing());
    }

    #[test]
    fn test_duplicate_submission_is_noop() {
        let mut wb = Workbench::default();
        let mut backend = canned(r#"[{"box_2d": [100, 200, 400, 600]}]"#);
        wb.submit_concept("car", &mut backend, "");
        assert!(wb.submit_concept("Car", &mut backend, "").is_none());
        assert_eq!(wb.store().concepts().len(), 1);
        assert_eq!(wb.store().annotations().len(), 1);
    }

    #[test]
    fn test_backend_failure_gives_floor_presence() {
        let mut wb = Workbench::default();
        let mut backend = TextResponseBackend::new("down", |_prompt: &str, _image: &str| {
            Err(AnnotatorError::backend("timeout"))
        });
        wb.submit_concept("car", &mut backend, "");

        let concept = wb.store().concept("car").unwrap();
        assert_eq!(concept.instance_count, 0);
        assert!((concept.presence_score - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_drawing_during_outstanding_request() {
        let mut wb = Workbench::default();
        let car = wb.begin_detection("car").unwrap();
        let _person = wb.begin_detection("person").unwrap();
        assert!(wb.snapshot().is_processing);

        wb.set_tool(AnnotationTool::Box);
        wb.set_active_concept(Some("person"));
        wb.pointer_down(Point::new(0.2, 0.2));
        assert!(matches!(
            wb.pointer_up(Point::new(0.5, 0.6)),
            GestureOutcome::Committed(_)
        ));

        assert!(wb.finish_detection(&car, Err(AnnotatorError::backend("offline"))));
        assert_eq!(wb.store().concept("person").unwrap().instance_count, 1);
        assert!(wb.store().is_processing());
    }

    #[test]
    fn test_late_result_after_delete_is_dropped() {
        let mut wb = Workbench::default();
        let ticket = wb.begin_detection("car").unwrap();
        wb.delete_concept("car");
        assert_eq!(wb.gestures().active_concept(), None);

        let raw = vec![RawDetection::with_box([0.0, 0.0, 500.0, 500.0])];
        assert!(!wb.finish_detection(&ticket, Ok(raw)));
        assert!(wb.store().annotations().is_empty());
    }

    #[test]
    fn test_hover_verify_and_reject() {
        let mut wb = Workbench::default();
        let mut backend = canned(
            r#"[{"box_2d": [100, 100, 600, 600]}, {"box_2d": [400, 400, 900, 900]}]"#,
        );
        wb.submit_concept("car", &mut backend, "");
        let upper = wb.store().annotations()[1].id.clone();

        assert_eq!(wb.pointer_move(Point::new(0.5, 0.5)), GestureOutcome::PassThrough);
        assert_eq!(wb.overlay().hovered(wb.store()).map(|a| a.id.clone()), Some(upper.clone()));
        assert_eq!(
            wb.hovered_affordances(),
            Affordances {
                verify: true,
                reject: true
            }
        );

        assert!(wb.verify_hovered());
        assert!(wb.store().annotation(&upper).unwrap().is_verified);
        assert!(!wb.hovered_affordances().verify);
        assert!(!wb.verify_hovered());

        let removed = wb.reject_hovered().unwrap();
        assert_eq!(removed.id, upper);
        assert_eq!(wb.store().concept("car").unwrap().instance_count, 1);
        assert!(wb.reject_hovered().is_none());
    }

    #[test]
    fn test_select_click_selects_topmost() {
        let mut wb = Workbench::default();
        let mut backend = canned(
            r#"[{"box_2d": [100, 100, 600, 600]}, {"box_2d": [400, 400, 900, 900]}]"#,
        );
        wb.submit_concept("car", &mut backend, "");
        let upper = wb.store().annotations()[1].id.clone();

        wb.set_tool(AnnotationTool::Select);
        wb.pointer_down(Point::new(0.5, 0.5));
        assert_eq!(wb.overlay().selected(wb.store()).map(|a| a.id.clone()), Some(upper));
    }

    #[test]
    fn test_hand_built_config_is_repaired() {
        let mut config = WorkbenchConfig::default();
        config.palette.clear();
        config.detection.scale_divisor = 0.0;
        let mut wb = Workbench::new(config);
        assert!(!wb.config().palette.is_empty());

        let mut backend = canned(r#"[{"box_2d": [100, 200, 400, 600]}]"#);
        wb.submit_concept("car", &mut backend, "");
        let bbox = wb.store().annotations()[0].bounding_box;
        assert!((bbox.ymin - 0.1).abs() < 1e-5);
        assert!((bbox.xmax - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_set_active_concept_rejects_unknown() {
        let mut wb = Workbench::default();
        assert!(!wb.set_active_concept(Some("ghost")));
        assert!(wb.set_active_concept(None));
    }

    #[test]
    fn test_simulated_session() {
        let mut config = WorkbenchConfig::default();
        config.simulator = SimulatorSettings {
            seed: Some(5),
            ..SimulatorSettings::default()
        };
        let mut simulator = Simulator::new(config.simulator);
        let mut wb = Workbench::new(config);

        let id = wb.simulate_concept("dog", &mut simulator).unwrap();
        let count = wb.store().concept(&id).unwrap().instance_count;
        assert!((1..=4).contains(&count));
        assert_eq!(wb.store().annotations_for(&id).count(), count);
    }

    #[test]
    fn test_playhead_filters_annotations() {
        let mut wb = Workbench::default();
        let mut backend = canned(
            r#"[{"box_2d": [0, 0, 100, 100], "frame_start": 0, "frame_end": 20},
                {"box_2d": [0, 0, 100, 100], "frame_start": 50, "frame_end": 100}]"#,
        );
        wb.submit_concept("car", &mut backend, "");

        wb.clock_mut().seek(10.0);
        assert_eq!(wb.visible_at_playhead().len(), 1);
        wb.clock_mut().seek(30.0);
        assert!(wb.visible_at_playhead().is_empty());

        wb.clock_mut().play();
        wb.tick(2.5);
        assert_eq!(wb.visible_at_playhead().len(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut wb = Workbench::default();
        let mut backend = canned(r#"[{"box_2d": [100, 200, 400, 600]}]"#);
        wb.submit_concept("car", &mut backend, "");

        let json = serde_json::to_string(&wb.snapshot()).unwrap();
        assert!(json.contains("\"instanceCount\":1"));
        assert!(json.contains("\"shapeKind\":\"box\""));
        assert!(json.contains("\"isProcessing\":false"));
    }
}
