//! Hover and selection resolution against overlapping regions.
//!
//! Annotations are hit-tested in insertion order and the last match wins, so
//! the most recently added region takes priority where regions overlap. Only
//! annotations whose concept is visible take part.

use crate::model::geometry::hit_test;
use crate::model::{Annotation, AnnotationId, Point};
use crate::store::AnnotationStore;

/// Review actions the presentation layer may offer for an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub verify: bool,
    pub reject: bool,
}

/// Tracks the hovered and selected annotation.
#[derive(Debug, Clone, Default)]
pub struct OverlayResolver {
    hovered: Option<AnnotationId>,
    selected: Option<AnnotationId>,
}

impl OverlayResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topmost renderable annotation under `point`.
    pub fn topmost_at<'a>(store: &'a AnnotationStore, point: &Point) -> Option<&'a Annotation> {
        store
            .renderable_annotations()
            .rfind(|a| hit_test(&a.bounding_box, point))
    }

    /// Re-hit-test after a pointer move. Returns the hovered id.
    pub fn update_hover(&mut self, store: &AnnotationStore, point: Point) -> Option<&str> {
        let hit = Self::topmost_at(store, &point).map(|a| a.id.clone());
        if hit != self.hovered {
            log::trace!("Hover: {:?} -> {:?}", self.hovered, hit);
            self.hovered = hit;
        }
        self.hovered.as_deref()
    }

    /// Hovered annotation, if it still exists and is still renderable.
    pub fn hovered<'a>(&self, store: &'a AnnotationStore) -> Option<&'a Annotation> {
        resolve(store, self.hovered.as_deref())
    }

    /// Select the topmost annotation under `point`, or clear the selection
    /// when clicking empty space.
    pub fn select_at(&mut self, store: &AnnotationStore, point: Point) -> Option<&str> {
        self.selected = Self::topmost_at(store, &point).map(|a| a.id.clone());
        match &self.selected {
            Some(id) => log::debug!("Selected annotation {}", id),
            None => log::debug!("No annotation at click position, cleared selection"),
        }
        self.selected.as_deref()
    }

    /// Selected annotation, if it still exists and is still renderable.
    pub fn selected<'a>(&self, store: &'a AnnotationStore) -> Option<&'a Annotation> {
        resolve(store, self.selected.as_deref())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Forget the hovered annotation (pointer left the canvas).
    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    /// Actions available for an annotation: verify only while unverified,
    /// reject always. Unknown ids get none.
    pub fn affordances(store: &AnnotationStore, annotation_id: &str) -> Affordances {
        match store.annotation(annotation_id) {
            Some(annotation) => Affordances {
                verify: !annotation.is_verified,
                reject: true,
            },
            None => Affordances::default(),
        }
    }
}

fn resolve<'a>(store: &'a AnnotationStore, id: Option<&str>) -> Option<&'a Annotation> {
    let annotation = store.annotation(id?)?;
    store.is_renderable(annotation).then_some(annotation)
}
