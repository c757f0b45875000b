//! Concept data model for user-declared label categories.

use serde::{Deserialize, Serialize};

/// Identifier of a concept, derived from its name.
pub type ConceptId = String;

/// A label category typed by the user and driving detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    /// Derived from `name`, see [`concept_id_from_name`]
    pub id: ConceptId,
    /// Display name as typed
    pub name: String,
    /// RGB color from the palette
    pub color: [u8; 3],
    /// Scene-relevance indicator in [0, 1]
    pub presence_score: f32,
    /// Number of live annotations under this concept
    pub instance_count: usize,
    /// Whether the render layer may draw this concept's annotations
    pub is_visible: bool,
    /// Store-wide creation number, used to discard stale detection results
    pub generation: u64,
}

impl Concept {
    /// Create a concept with no annotations yet.
    pub(crate) fn new(name: &str, color: [u8; 3], presence_prior: f32, generation: u64) -> Self {
        Self {
            id: concept_id_from_name(name),
            name: name.trim().to_string(),
            color,
            presence_score: presence_prior,
            instance_count: 0,
            is_visible: true,
            generation,
        }
    }

    /// Hex string of the concept color, e.g. `#3b82f6`.
    pub fn color_hex(&self) -> String {
        let [r, g, b] = self.color;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Derive a concept id: trimmed, lowercased, whitespace runs joined by hyphens.
pub fn concept_id_from_name(name: &str) -> ConceptId {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_id_from_name() {
        assert_eq!(concept_id_from_name("Red Car"), "red-car");
        assert_eq!(concept_id_from_name("  person  "), "person");
        assert_eq!(concept_id_from_name("traffic \t light"), "traffic-light");
        assert_eq!(concept_id_from_name("   "), "");
    }

    #[test]
    fn test_color_hex() {
        let concept = Concept::new("car", [59, 130, 246], 0.92, 1);
        assert_eq!(concept.color_hex(), "#3b82f6");
        assert_eq!(concept.name, "car");
        assert!(concept.is_visible);
    }
}
