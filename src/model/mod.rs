//! Data models for the annotation core.

mod annotation;
mod concept;
pub mod geometry;

pub use annotation::{Annotation, AnnotationId, DraftShape, ShapeKind};
pub(crate) use annotation::generate_id;
pub use concept::{Concept, ConceptId, concept_id_from_name};
pub use geometry::{BoundingBox, Point};
