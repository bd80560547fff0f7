// src/config.rs - Tracker settings, loadable from a JSON file
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::analysis::{CaptureRegion, FrameAnalyzer, ReferenceResolution};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    Synthetic,
    Images,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub capture_region: CaptureRegion,
    pub reference_resolution: ReferenceResolution,
    pub visibility_threshold: f64,
    pub frame_interval_ms: u64,
    pub camera_index: u32,
    pub source: SourceKind,
    pub image_dir: Option<PathBuf>,
    pub max_duration_secs: Option<u64>,
    pub output_directory: PathBuf,
    pub record_session: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capture_region: CaptureRegion::default(),
            reference_resolution: ReferenceResolution::default(),
            visibility_threshold: 0.0,
            frame_interval_ms: 33,
            camera_index: 0,
            source: SourceKind::Camera,
            image_dir: None,
            max_duration_secs: None,
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("ErgoTracker")))
                .unwrap_or_else(|| PathBuf::from("./output")),
            record_session: true,
        }
    }
}

impl TrackerConfig {
    /// Reads a JSON config; fields it leaves out keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let region = &self.capture_region;
        if region.width <= 0.0 || region.height <= 0.0 {
            return Err(ConfigError::Invalid("capture region must have a positive size".into()));
        }
        if self.reference_resolution.width <= 0.0 || self.reference_resolution.height <= 0.0 {
            return Err(ConfigError::Invalid("reference resolution must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(ConfigError::Invalid(format!(
                "visibility threshold {} is outside 0..=1",
                self.visibility_threshold
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame interval must be at least 1 ms".into()));
        }
        if self.source == SourceKind::Images && self.image_dir.is_none() {
            return Err(ConfigError::Invalid("the images source needs image_dir".into()));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn analyzer(&self) -> FrameAnalyzer {
        FrameAnalyzer::new(self.capture_region, self.reference_resolution)
            .with_visibility_threshold(self.visibility_threshold)
    }
}
