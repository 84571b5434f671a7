use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use faceblur_core::shared::config::{BlurConfig, DetectionFailurePolicy};
use faceblur_core::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_KERNEL_SIZE, DEFAULT_POLL_INTERVAL_MS,
};

/// Persisted preferences of the live window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_index: u32,
    pub kernel_size: u32,
    /// Detection confidence in percent.
    pub confidence: u32,
    pub on_detection_error: DetectionFailurePolicy,
    pub poll_interval_ms: u64,
    pub model_path: Option<PathBuf>,
    pub model_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: DEFAULT_CAMERA_INDEX,
            kernel_size: DEFAULT_KERNEL_SIZE as u32,
            confidence: 50,
            on_detection_error: DetectionFailurePolicy::Obscure,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            model_path: None,
            model_url: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("faceblur").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                log::warn!("Could not save settings to {}: {e}", path.display());
            }
        }
    }

    /// Missing or malformed files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn to_config(&self) -> BlurConfig {
        BlurConfig {
            kernel_size: self.kernel_size.max(1) as usize,
            confidence: self.confidence.min(100) as f64 / 100.0,
            camera_index: self.camera_index,
            failure_policy: self.on_detection_error,
            ..BlurConfig::default()
        }
    }
}
