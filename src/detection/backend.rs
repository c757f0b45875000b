//! Boundary to the external detection collaborator.

use super::raw::{RawDetection, parse_payload};
use crate::error::Result;

/// A source of raw detections for a prompt and an image.
///
/// Implementations may fail; callers go through [`detect_or_empty`] so a
/// failure never reaches the interactive session.
pub trait DetectionBackend {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Run one request/response exchange.
    fn detect(&mut self, prompt: &str, image_base64: &str) -> Result<Vec<RawDetection>>;
}

/// Run `backend`, degrading any failure to an empty result.
pub fn detect_or_empty(
    backend: &mut dyn DetectionBackend,
    prompt: &str,
    image_base64: &str,
) -> Vec<RawDetection> {
    match backend.detect(prompt, image_base64) {
        Ok(records) => {
            log::debug!(
                "Backend '{}' returned {} detections for '{}'",
                backend.name(),
                records.len(),
                prompt
            );
            records
        }
        Err(e) => {
            log::warn!("Backend '{}' failed for '{}': {}", backend.name(), prompt, e);
            Vec::new()
        }
    }
}

/// Adapts a transport returning raw response text (for example an HTTP call
/// to a multimodal model) into a [`DetectionBackend`].
pub struct TextResponseBackend<F> {
    name: String,
    transport: F,
}

impl<F> TextResponseBackend<F>
where
    F: FnMut(&str, &str) -> Result<String>,
{
    pub fn new(name: impl Into<String>, transport: F) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }
}

impl<F> DetectionBackend for TextResponseBackend<F>
where
    F: FnMut(&str, &str) -> Result<String>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, prompt: &str, image_base64: &str) -> Result<Vec<RawDetection>> {
        let text = (self.transport)(prompt, image_base64)?;
        parse_payload(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnnotatorError;

    #[test]
    fn test_text_backend_parses_response() {
        let mut backend = TextResponseBackend::new("canned", |_prompt: &str, _image: &str| {
            Ok(r#"[{"box_2d": [0, 0, 100, 100]}]"#.to_string())
        });
        let records = detect_or_empty(&mut backend, "car", "");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_failures_degrade_to_empty() {
        let mut offline = TextResponseBackend::new("offline", |_prompt: &str, _image: &str| {
            Err(AnnotatorError::backend("connection refused"))
        });
        assert!(detect_or_empty(&mut offline, "car", "").is_empty());

        let mut garbled = TextResponseBackend::new("garbled", |_prompt: &str, _image: &str| {
            Ok("I could not find any cars".to_string())
        });
        assert!(detect_or_empty(&mut garbled, "car", "").is_empty());
    }
}
