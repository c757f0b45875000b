//! Error types for annotation operations.
//!
//! None of these cross the public boundary of the store or workbench: they are
//! produced internally, logged, and absorbed into "no effect" or "empty result".

use thiserror::Error;

/// Errors that can occur inside the annotation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotatorError {
    /// Malformed point sequence or shape
    #[error("Invalid geometry: {reason}")]
    InvalidGeometry {
        /// Description of what was wrong with the geometry
        reason: String,
    },

    /// Mutation referenced a concept or annotation that does not exist
    #[error("Unresolved {kind} reference: {id}")]
    UnresolvedReference {
        /// What kind of entity was referenced ("concept" or "annotation")
        kind: &'static str,
        /// The id that failed to resolve
        id: String,
    },

    /// Network or parse failure from the detection collaborator
    #[error("Detection backend failure: {message}")]
    BackendFailure {
        /// Description of the failure
        message: String,
    },
}

impl AnnotatorError {
    /// Create an invalid geometry error.
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Create an unresolved concept reference error.
    pub fn unknown_concept(id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind: "concept",
            id: id.into(),
        }
    }

    /// Create an unresolved annotation reference error.
    pub fn unknown_annotation(id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind: "annotation",
            id: id.into(),
        }
    }

    /// Create a backend failure error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendFailure {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AnnotatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::backend(format!("malformed detection payload: {err}"))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnnotatorError::unknown_concept("red-car");
        assert_eq!(err.to_string(), "Unresolved concept reference: red-car");

        let err = AnnotatorError::invalid_geometry("empty point sequence");
        assert_eq!(err.to_string(), "Invalid geometry: empty point sequence");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: AnnotatorError = json_err.into();
        assert!(matches!(err, AnnotatorError::BackendFailure { .. }));
    }
}
