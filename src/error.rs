// src/error.rs - Error types for capture, landmark inference and system commands
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Failed to open camera {index}: {reason}")]
    CameraOpen { index: u32, reason: String },

    #[error("Failed to capture frame: {reason}")]
    Capture { reason: String },

    #[error("Landmark sidecar failed to start: {reason}")]
    SidecarStart { reason: String },

    #[error("Landmark sidecar I/O failed: {0}")]
    SidecarIo(#[source] std::io::Error),

    #[error("Malformed landmark reply: {reason}")]
    SidecarProtocol { reason: String },

    #[error("Expected 21 hand landmarks, got {count}")]
    LandmarkCount { count: usize },

    #[error("Command `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    #[error(transparent)]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid settings in {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, ControllerError>;
