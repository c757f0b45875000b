//! Loosely-typed detection records as produced by an external detector.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnnotatorError, Result};

/// One detection as reported by the backend. Every field is optional; records
/// without a usable `box_2d` are dropped by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// `[ymin, xmin, ymax, xmax]` in the detector's coordinate scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_2d: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_depth: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    /// "box", "polygon" or "point"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// `[y, x]` pairs in the same scale as `box_2d`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f32; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_masklet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_start: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_end: Option<f32>,
}

impl RawDetection {
    /// A record holding only a box.
    pub fn with_box(box_2d: [f32; 4]) -> Self {
        Self {
            box_2d: Some(box_2d.to_vec()),
            ..Self::default()
        }
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Parse backend text into detection records.
///
/// Accepts a JSON array of records, a single record object, or either wrapped
/// in a Markdown code fence. Records that fail to deserialize are skipped.
pub fn parse_payload(text: &str) -> Result<Vec<RawDetection>> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(body)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(records_from_values(items)),
        Value::Object(_) => Ok(records_from_values(vec![value])),
        other => Err(AnnotatorError::backend(format!(
            "expected a list of detections, got {}",
            json_kind(&other)
        ))),
    }
}

fn records_from_values(items: Vec<Value>) -> Vec<RawDetection> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<RawDetection>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping malformed detection record {}: {}", index, e);
                None
            }
        })
        .collect()
}

/// Remove a surrounding ```` ``` ```` fence (with optional language tag).
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
