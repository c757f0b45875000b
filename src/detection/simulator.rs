//! Offline detector fabricating plausible random detections.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::backend::{DetectionBackend, detect_or_empty};
use super::normalizer::DetectionNormalizer;
use super::raw::RawDetection;
use crate::config::SimulatorSettings;
use crate::constants::DEFAULT_SCALE_DIVISOR;
use crate::error::Result;
use crate::model::Annotation;

const ORIENTATIONS: [&str; 5] = [
    "Facing camera",
    "Facing left",
    "Facing right",
    "Facing away",
    "Top-down",
];

const PLACEMENTS: [&str; 5] = [
    "in the foreground",
    "near the center of the scene",
    "partially occluded in the background",
    "at the left edge of the frame",
    "at the right edge of the frame",
];

/// Random detector on a 0-1000 grid, seedable for reproducible runs.
pub struct Simulator {
    rng: StdRng,
    settings: SimulatorSettings,
}

impl Simulator {
    pub fn new(settings: SimulatorSettings) -> Self {
        let settings = settings.sanitized();
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng, settings }
    }

    /// Fabricate detections for `concept_id` and normalize them.
    pub fn simulate(&mut self, concept_id: &str, normalizer: &DetectionNormalizer) -> Vec<Annotation> {
        let raw = detect_or_empty(self, concept_id, "");
        // The simulator always reports on its own grid
        let normalizer = DetectionNormalizer {
            scale_divisor: DEFAULT_SCALE_DIVISOR,
            ..*normalizer
        };
        normalizer.normalize(&raw, concept_id)
    }

    fn random_detection(&mut self, prompt: &str) -> RawDetection {
        let height = self.rng.random_range(60.0..400.0_f32);
        let width = self.rng.random_range(60.0..400.0_f32);
        let ymin = self.rng.random_range(0.0..1000.0 - height);
        let xmin = self.rng.random_range(0.0..1000.0 - width);

        let frame_start = self.rng.random_range(0.0..60.0_f32);
        let frame_end = self.rng.random_range(frame_start + 10.0..=100.0);

        let placement = PLACEMENTS.choose(&mut self.rng).copied().unwrap_or_default();
        let orientation = ORIENTATIONS.choose(&mut self.rng).copied().unwrap_or_default();

        RawDetection {
            box_2d: Some(vec![ymin, xmin, ymin + height, xmin + width]),
            confidence: Some(self.rng.random_range(0.6..0.98)),
            spatial_context: Some(format!("A {} {}", prompt, placement)),
            estimated_depth: Some(self.rng.random_range(0..=10) as f32),
            orientation: Some(orientation.to_string()),
            shape: None,
            points: None,
            is_masklet: Some(self.rng.random_bool(0.5)),
            frame_start: Some(frame_start),
            frame_end: Some(frame_end),
        }
    }
}

impl DetectionBackend for Simulator {
    fn name(&self) -> &str {
        "simulator"
    }

    fn detect(&mut self, prompt: &str, _image_base64: &str) -> Result<Vec<RawDetection>> {
        if self.rng.random_bool(self.settings.miss_probability) {
            log::debug!("Simulator found no '{}'", prompt);
            return Ok(Vec::new());
        }
        let count = self
            .rng
            .random_range(self.settings.min_detections..=self.settings.max_detections);
        Ok((0..count).map(|_| self.random_detection(prompt)).collect())
    }
}
