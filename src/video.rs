// src/video.rs - Camera capture with mirrored frames
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{ControllerError, Result};

/// Anything that yields RGB frames, one blocking call per frame.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<RgbImage>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Flip horizontally so the preview behaves like a mirror.
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
            mirror: true,
        }
    }
}

pub fn list_cameras() -> Result<Vec<String>> {
    nokhwa::query(ApiBackend::Auto)
        .map(|cameras| cameras.iter().map(|c| c.human_name()).collect())
        .map_err(|e| ControllerError::CameraOpen {
            index: 0,
            reason: format!("failed to query cameras: {}", e),
        })
}

pub struct CameraSource {
    camera: Camera,
    mirror: bool,
}

impl CameraSource {
    #[instrument]
    pub fn open(settings: &CameraSettings) -> Result<Self> {
        let format = CameraFormat::new(
            Resolution::new(settings.width, settings.height),
            FrameFormat::MJPEG,
            settings.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let open_error = |e: nokhwa::NokhwaError| ControllerError::CameraOpen {
            index: settings.index,
            reason: e.to_string(),
        };

        let mut camera = Camera::new(CameraIndex::Index(settings.index), requested).map_err(open_error)?;
        camera.open_stream().map_err(open_error)?;

        info!(
            camera = %camera.info().human_name(),
            format = %camera.camera_format(),
            "Camera stream opened"
        );

        Ok(Self {
            camera,
            mirror: settings.mirror,
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }
}

impl FrameSource for CameraSource {
    fn read_frame(&mut self) -> Result<RgbImage> {
        let capture_error = |e: nokhwa::NokhwaError| ControllerError::Capture { reason: e.to_string() };

        let frame = self.camera.frame().map_err(capture_error)?;
        let decoded = frame.decode_image::<RgbFormat>().map_err(capture_error)?;

        if self.mirror {
            Ok(image::imageops::flip_horizontal(&decoded))
        } else {
            Ok(decoded)
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!(error = %e, "Failed to stop camera stream");
        }
    }
}
