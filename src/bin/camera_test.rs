// Probes the configured camera and hand landmark sidecar without opening a window.
use anyhow::Context;
use gesture_volume::config::AppSettings;
use gesture_volume::mediapipe_bridge::{LandmarkProvider, MediaPipeSidecar};
use gesture_volume::video::{self, CameraSource, FrameSource};
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let settings = AppSettings::load().context("failed to load settings")?;

    let cameras = video::list_cameras()?;
    info!(count = cameras.len(), "Cameras found");
    for (index, name) in cameras.iter().enumerate() {
        info!(index, %name, "Camera");
    }

    let mut camera = CameraSource::open(&settings.camera).with_context(|| {
        format!(
            "failed to open camera {}; is it in use or is camera permission missing?",
            settings.camera.index
        )
    })?;
    let frame = camera.read_frame().context("failed to capture frame")?;
    info!(width = frame.width(), height = frame.height(), "Frame captured");

    let mut sidecar = MediaPipeSidecar::spawn(&settings.landmarks).with_context(|| {
        format!(
            "failed to start {:?} {:?}",
            settings.landmarks.program, settings.landmarks.script
        )
    })?;
    let hands = sidecar.process(&frame).context("sidecar did not answer")?;
    info!(hands = hands.len(), "Sidecar replied");

    info!("Camera and landmark sidecar are working");
    Ok(())
}
