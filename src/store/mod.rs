//! Authoritative in-memory model of concepts and annotations.
//!
//! The store keeps concept aggregates consistent with the live annotations:
//! `instance_count` always equals the number of annotations under a concept.
//! Every public mutation either fully commits or, when it references an id
//! that does not exist, is a silent no-op (logged at debug level).

use std::collections::HashSet;

use crate::config::{ScoringSettings, WorkbenchConfig};
use crate::constants::CONCEPT_PALETTE;
use crate::error::{AnnotatorError, Result};
use crate::model::{
    Annotation, AnnotationId, Concept, ConceptId, DraftShape, concept_id_from_name, generate_id,
};


/// Handle for an outstanding detection request.
///
/// Binds the eventual result to the concept generation that existed when the
/// request started, so a late response for a deleted (or deleted and
/// re-created) concept is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetectionTicket {
    pub concept_id: ConceptId,
    generation: u64,
    request: u64,
}

/// Storage for the concepts and annotations of one session.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    /// Concepts in creation order.
    concepts: Vec<Concept>,
    /// Annotations in insertion order (later entries are drawn on top).
    annotations: Vec<Annotation>,
    palette: Vec<[u8; 3]>,
    scoring: ScoringSettings,
    /// Counter for concept generations and request numbers.
    next_generation: u64,
    /// Counter for ids minted by the store itself.
    next_seq: u64,
    /// Request numbers of detections still in flight.
    outstanding: HashSet<u64>,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(&WorkbenchConfig::default())
    }
}

impl AnnotationStore {
    pub fn new(config: &WorkbenchConfig) -> Self {
        Self {
            concepts: Vec::new(),
            annotations: Vec::new(),
            palette: if config.palette.is_empty() {
                log::warn!("Configured palette is empty, using default palette");
                CONCEPT_PALETTE.to_vec()
            } else {
                config.palette.clone()
            },
            scoring: config.scoring,
            next_generation: 1,
            next_seq: 0,
            outstanding: HashSet::new(),
        }
    }

    // ========================================================================
    // Read-only snapshots
    // ========================================================================

    /// All concepts in creation order.
    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    /// All annotations in insertion order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.id == id)
    }

    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Annotations owned by one concept, in insertion order.
    pub fn annotations_for<'a>(
        &'a self,
        concept_id: &'a str,
    ) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .iter()
            .filter(move |a| a.concept_id == concept_id)
    }

    /// True if the owning concept exists and is visible.
    pub fn is_renderable(&self, annotation: &Annotation) -> bool {
        self.concept(&annotation.concept_id)
            .is_some_and(|c| c.is_visible)
    }

    /// Renderable annotations in insertion order.
    pub fn renderable_annotations(&self) -> impl DoubleEndedIterator<Item = &Annotation> {
        self.annotations.iter().filter(|a| self.is_renderable(a))
    }

    /// Annotations whose temporal extent covers `frame`.
    pub fn annotations_at_frame(&self, frame: f32) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.is_active_at(frame))
    }

    /// True while at least one detection request is outstanding.
    pub fn is_processing(&self) -> bool {
        !self.outstanding.is_empty()
    }

    // ========================================================================
    // Concepts
    // ========================================================================

    /// Declare a concept. Returns the existing id if one with the same derived
    /// id is already present, and `None` for names without any visible text.
    pub fn add_concept(&mut self, name: &str) -> Option<ConceptId> {
        let id = concept_id_from_name(name);
        if id.is_empty() {
            log::debug!("Ignoring concept with empty name {:?}", name);
            return None;
        }
        if self.concept(&id).is_some() {
            log::debug!("Concept '{}' already exists", id);
            return Some(id);
        }

        let color = self.palette[self.concepts.len() % self.palette.len()];
        let generation = self.bump_generation();
        let concept = Concept::new(name, color, self.scoring.presence_prior, generation);
        log::info!("Added concept '{}' ({})", concept.id, concept.color_hex());
        self.concepts.push(concept);
        Some(id)
    }

    /// Flip a concept's visibility. Returns false if the concept is unknown.
    pub fn toggle_visibility(&mut self, concept_id: &str) -> bool {
        match self.concept_index(concept_id) {
            Ok(idx) => {
                let concept = &mut self.concepts[idx];
                concept.is_visible = !concept.is_visible;
                log::debug!(
                    "Concept '{}' visible: {}",
                    concept.id,
                    concept.is_visible
                );
                        true
            }
            Err(e) => {
                log::debug!("toggle_visibility ignored: {}", e);
                false
            }
        }
    }

    /// Remove a concept and every annotation under it.
    pub fn delete_concept(&mut self, concept_id: &str) -> Option<Concept> {
        let idx = match self.concept_index(concept_id) {
            Ok(idx) => idx,
            Err(e) => {
                log::debug!("delete_concept ignored: {}", e);
                return None;
            }
        };

        let concept = self.concepts.remove(idx);
        let before = self.annotations.len();
        self.annotations.retain(|a| a.concept_id != concept.id);
        log::info!(
            "Deleted concept '{}' and {} annotations",
            concept.id,
            before - self.annotations.len()
        );
        Some(concept)
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    /// Append a detection batch for a concept and recompute its aggregates.
    ///
    /// A non-empty batch sets `presence_score` to the batch mean confidence;
    /// an empty batch sets it to the presence floor. Returns the number of
    /// annotations appended.
    pub fn add_annotations(&mut self, concept_id: &str, batch: Vec<Annotation>) -> usize {
        match self.try_add_annotations(concept_id, batch) {
            Ok(count) => count,
            Err(e) => {
                log::debug!("add_annotations ignored: {}", e);
                0
            }
        }
    }

    fn try_add_annotations(&mut self, concept_id: &str, batch: Vec<Annotation>) -> Result<usize> {
        let idx = self.concept_index(concept_id)?;
        let count = batch.len();

        let presence = if batch.is_empty() {
            self.scoring.presence_floor
        } else {
            batch.iter().map(|a| a.confidence).sum::<f32>() / count as f32
        };

        for mut annotation in batch {
            annotation.concept_id = concept_id.to_string();
            if self.annotation(&annotation.id).is_some() {
                annotation.id = self.mint_unique_id(concept_id);
            }
            self.annotations.push(annotation);
        }

        let live = self.live_count(concept_id);
        let concept = &mut self.concepts[idx];
        concept.presence_score = presence;
        concept.instance_count = live;
        log::info!(
            "Concept '{}': +{} annotations, presence {:.2}",
            concept_id,
            count,
            presence
        );
        Ok(count)
    }

    /// Add a hand-drawn shape. It is verified immediately with the manual
    /// confidence, and the concept's presence becomes the running mean.
    pub fn add_single_annotation(
        &mut self,
        concept_id: &str,
        draft: DraftShape,
    ) -> Option<AnnotationId> {
        match self.try_add_single_annotation(concept_id, draft) {
            Ok(id) => Some(id),
            Err(e) => {
                log::debug!("add_single_annotation ignored: {}", e);
                None
            }
        }
    }

    fn try_add_single_annotation(
        &mut self,
        concept_id: &str,
        draft: DraftShape,
    ) -> Result<AnnotationId> {
        let idx = self.concept_index(concept_id)?;
        let id = self.mint_unique_id("manual");
        let kind = draft.kind;
        let annotation =
            draft.into_annotation(id.clone(), concept_id.to_string(), self.scoring.manual_confidence);
        let confidence = annotation.confidence;
        self.annotations.push(annotation);

        let live = self.live_count(concept_id);
        let concept = &mut self.concepts[idx];
        let previous = concept.instance_count as f32;
        concept.presence_score = if concept.instance_count == 0 {
            confidence
        } else {
            (concept.presence_score * previous + confidence) / (previous + 1.0)
        };
        concept.instance_count = live;
        log::info!(
            "Created {} annotation {} for '{}' (count: {})",
            kind.name(),
            id,
            concept_id,
            live
        );
        Ok(id)
    }

    /// Mark an annotation as verified. Idempotent; aggregates are unchanged.
    pub fn verify(&mut self, annotation_id: &str) -> bool {
        match self.annotation_index(annotation_id) {
            Ok(idx) => {
                let annotation = &mut self.annotations[idx];
                if !annotation.is_verified {
                    annotation.is_verified = true;
                    log::info!("Verified annotation {}", annotation_id);
                }
                true
            }
            Err(e) => {
                log::debug!("verify ignored: {}", e);
                false
            }
        }
    }

    /// Remove an annotation and recount its concept.
    ///
    /// The concept's presence score is left as it was before the removal.
    pub fn reject(&mut self, annotation_id: &str) -> Option<Annotation> {
        let idx = match self.annotation_index(annotation_id) {
            Ok(idx) => idx,
            Err(e) => {
                log::debug!("reject ignored: {}", e);
                return None;
            }
        };

        let removed = self.annotations.remove(idx);
        let live = self.live_count(&removed.concept_id);
        if let Ok(concept_idx) = self.concept_index(&removed.concept_id) {
            self.concepts[concept_idx].instance_count = live;
        }
        log::info!(
            "Rejected annotation {} of '{}' (remaining: {})",
            removed.id,
            removed.concept_id,
            live
        );
        Some(removed)
    }

    // ========================================================================
    // Detection requests
    // ========================================================================

    /// Register an outstanding detection request for a concept.
    pub fn begin_detection(&mut self, concept_id: &str) -> Option<DetectionTicket> {
        let generation = match self.concept_index(concept_id) {
            Ok(idx) => self.concepts[idx].generation,
            Err(e) => {
                log::debug!("begin_detection ignored: {}", e);
                return None;
            }
        };
        let request = self.bump_generation();
        self.outstanding.insert(request);
        log::debug!("Detection request {} started for '{}'", request, concept_id);
        Some(DetectionTicket {
            concept_id: concept_id.to_string(),
            generation,
            request,
        })
    }

    /// Apply the result of a detection request.
    ///
    /// The batch is discarded if the request was already completed, or if the
    /// concept was deleted or re-created since the request started. Returns
    /// true if the batch was applied.
    pub fn complete_detection(&mut self, ticket: &DetectionTicket, batch: Vec<Annotation>) -> bool {
        if !self.outstanding.remove(&ticket.request) {
            log::warn!(
                "Detection request {} for '{}' completed twice, ignoring",
                ticket.request,
                ticket.concept_id
            );
            return false;
        }

        match self.concept(&ticket.concept_id) {
            Some(concept) if concept.generation == ticket.generation => {}
            Some(_) => {
                log::info!(
                    "Discarding stale detections for re-created concept '{}'",
                    ticket.concept_id
                );
                return false;
            }
            None => {
                log::info!(
                    "Discarding detections for deleted concept '{}'",
                    ticket.concept_id
                );
                return false;
            }
        }

        self.add_annotations(&ticket.concept_id, batch);
        true
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn concept_index(&self, id: &str) -> Result<usize> {
        self.concepts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AnnotatorError::unknown_concept(id))
    }

    fn annotation_index(&self, id: &str) -> Result<usize> {
        self.annotations
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| AnnotatorError::unknown_annotation(id))
    }

    fn live_count(&self, concept_id: &str) -> usize {
        self.annotations_for(concept_id).count()
    }

    fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Mint an id no live annotation carries.
    fn mint_unique_id(&mut self, prefix: &str) -> AnnotationId {
        loop {
            let id = generate_id(prefix, self.next_seq);
            self.next_seq += 1;
            if self.annotation(&id).is_none() {
                return id;
            }
        }
    }
}
