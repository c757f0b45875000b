//! Configuration file support.
//!
//! Policy values (score priors, thresholds, palette, simulator behavior) are
//! read from a JSON file. Every field has a serde default so partial files
//! load; a missing or unreadable file falls back to [`WorkbenchConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONCEPT_PALETTE, DEFAULT_DETECTION_CONFIDENCE, DEFAULT_PLAYBACK_SPEED, DEFAULT_SCALE_DIVISOR,
    MANUAL_CONFIDENCE, MIN_BOX_SIDE, POINT_BOX_RADIUS, PRESENCE_FLOOR, PRESENCE_PRIOR,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Workbench configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub detection: DetectionSettings,

    #[serde(default)]
    pub scoring: ScoringSettings,

    #[serde(default)]
    pub drawing: DrawingSettings,

    #[serde(default)]
    pub simulator: SimulatorSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,

    /// Concept colors, assigned round-robin
    #[serde(default = "default_palette")]
    pub palette: Vec<[u8; 3]>,
}

fn default_palette() -> Vec<[u8; 3]> {
    CONCEPT_PALETTE.to_vec()
}

/// How raw detector output is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Divisor bringing detector coordinates into [0, 1]
    #[serde(default = "default_scale_divisor")]
    pub scale_divisor: f32,
    /// Confidence used when a detection omits one
    #[serde(default = "default_detection_confidence")]
    pub default_confidence: f32,
}

fn default_scale_divisor() -> f32 {
    DEFAULT_SCALE_DIVISOR
}

fn default_detection_confidence() -> f32 {
    DEFAULT_DETECTION_CONFIDENCE
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            scale_divisor: default_scale_divisor(),
            default_confidence: default_detection_confidence(),
        }
    }
}

/// Presence score policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Score of a fresh concept before its first batch
    #[serde(default = "default_presence_prior")]
    pub presence_prior: f32,
    /// Score after a detection batch came back empty
    #[serde(default = "default_presence_floor")]
    pub presence_floor: f32,
    /// Confidence of hand-drawn shapes
    #[serde(default = "default_manual_confidence")]
    pub manual_confidence: f32,
}

fn default_presence_prior() -> f32 {
    PRESENCE_PRIOR
}

fn default_presence_floor() -> f32 {
    PRESENCE_FLOOR
}

fn default_manual_confidence() -> f32 {
    MANUAL_CONFIDENCE
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            presence_prior: default_presence_prior(),
            presence_floor: default_presence_floor(),
            manual_confidence: default_manual_confidence(),
        }
    }
}

/// Gesture thresholds, in normalized units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingSettings {
    #[serde(default = "default_min_box_side")]
    pub min_box_side: f32,
    #[serde(default = "default_point_box_radius")]
    pub point_box_radius: f32,
}

fn default_min_box_side() -> f32 {
    MIN_BOX_SIDE
}

fn default_point_box_radius() -> f32 {
    POINT_BOX_RADIUS
}

impl Default for DrawingSettings {
    fn default() -> Self {
        Self {
            min_box_side: default_min_box_side(),
            point_box_radius: default_point_box_radius(),
        }
    }
}

/// Behavior of the offline detection simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorSettings {
    /// Fewest detections per request
    #[serde(default = "default_min_detections")]
    pub min_detections: usize,
    /// Most detections per request
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
    /// Probability that a request finds nothing
    #[serde(default)]
    pub miss_probability: f64,
    /// Fixed RNG seed for reproducible sessions
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_min_detections() -> usize {
    1
}

fn default_max_detections() -> usize {
    4
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            min_detections: default_min_detections(),
            max_detections: default_max_detections(),
            miss_probability: 0.0,
            seed: None,
        }
    }
}

impl SimulatorSettings {
    /// Order the detection range and keep the miss probability in [0, 1].
    pub(crate) fn sanitized(mut self) -> Self {
        if self.max_detections < self.min_detections {
            log::warn!(
                "Simulator max_detections {} below min_detections {}, raising it",
                self.max_detections,
                self.min_detections
            );
            self.max_detections = self.min_detections;
        }
        self.miss_probability = if self.miss_probability.is_nan() {
            0.0
        } else {
            self.miss_probability.clamp(0.0, 1.0)
        };
        self
    }
}

/// Timeline playback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Timeline units advanced per second
    #[serde(default = "default_playback_speed")]
    pub speed: f32,
}

fn default_playback_speed() -> f32 {
    DEFAULT_PLAYBACK_SPEED
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: default_playback_speed(),
        }
    }
}

impl WorkbenchConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            detection: DetectionSettings::default(),
            scoring: ScoringSettings::default(),
            drawing: DrawingSettings::default(),
            simulator: SimulatorSettings::default(),
            playback: PlaybackSettings::default(),
            palette: default_palette(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config.sanitized())
    }

    /// Replace values that would break store or normalizer invariants.
    pub(crate) fn sanitized(mut self) -> Self {
        if self.palette.is_empty() {
            log::warn!("Configured palette is empty, using default palette");
            self.palette = default_palette();
        }
        let divisor = self.detection.scale_divisor;
        if divisor.is_nan() || divisor <= 0.0 {
            log::warn!(
                "Invalid scale divisor {}, using {}",
                self.detection.scale_divisor,
                DEFAULT_SCALE_DIVISOR
            );
            self.detection.scale_divisor = DEFAULT_SCALE_DIVISOR;
        }
        self.simulator = self.simulator.sanitized();
        self
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "concept-annotator.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(
                config_dir
                    .join("concept-annotator")
                    .join(Self::default_filename()),
            )
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("concept-annotator")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path` (or the default path), falling back to defaults on any failure.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Self::default(),
        };
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
