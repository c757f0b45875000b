//! Concept Annotator - prompt-driven image annotation core
//!
//! Users declare named concepts, an external detector proposes regions for
//! each one, and the user verifies, rejects, or hand-draws regions on a
//! normalized canvas. Rendering and widgets live outside this crate; the
//! presentation layer reads snapshots and feeds pointer events in.

pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod gesture;
pub mod model;
pub mod overlay;
pub mod store;
pub mod timeline;
pub mod workbench;

pub use config::WorkbenchConfig;
pub use error::{AnnotatorError, Result};
pub use gesture::{AnnotationTool, GestureController, GestureOutcome};
pub use model::{Annotation, BoundingBox, Concept, DraftShape, Point, ShapeKind};
pub use overlay::OverlayResolver;
pub use store::{AnnotationStore, DetectionTicket};
pub use workbench::Workbench;
