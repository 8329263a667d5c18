// src/config.rs - Application settings loaded from config.toml
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ControllerError, Result};
use crate::mediapipe_bridge::LandmarkSettings;
use crate::system::SystemBackend;
use crate::video::CameraSettings;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "GESTURE_VOLUME_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: f32,
    pub height: f32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Gesture Volume Control".to_string(),
            width: 960.0,
            height: 720.0,
        }
    }
}

/// Everything is optional in the file; missing keys take their defaults.
/// Gesture thresholds are fixed and deliberately not part of the settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub camera: CameraSettings,
    pub landmarks: LandmarkSettings,
    pub backend: SystemBackend,
    pub window: WindowSettings,
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No config directory available, using default settings");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(config_path = ?path, "No config found, using default settings");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ControllerError::Config {
            path: path.to_path_buf(),
            reason: format!("failed to read: {}", e),
        })?;

        let settings = Self::from_toml(&contents).map_err(|e| ControllerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(config_path = ?path, "Configuration loaded");
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            debug!(config_path = ?path, "Config path taken from environment");
            return Some(PathBuf::from(path));
        }

        ProjectDirs::from("com", "gesturevolume", "GestureVolume")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
