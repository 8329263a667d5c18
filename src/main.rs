// src/main.rs
mod app;
mod ui;

use anyhow::{anyhow, Context};
use eframe::egui;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gesture_volume::config::AppSettings;
use gesture_volume::frame_loop::{FrameLoop, SystemClock};
use gesture_volume::mediapipe_bridge::MediaPipeSidecar;
use gesture_volume::video::{self, CameraSource};
use gesture_volume::system;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gesture_volume=info")))
        .init();

    if let Ok(p) = std::env::current_exe() {
        info!(exe = %p.display(), "Running");
    }

    let settings = AppSettings::load().context("Failed to load settings")?;

    match video::list_cameras() {
        Ok(cameras) => {
            info!(count = cameras.len(), "Cameras detected");
            for (i, name) in cameras.iter().enumerate() {
                info!(index = i, %name, "Camera");
            }
        }
        Err(e) => warn!(error = %e, "Failed to query cameras"),
    }

    let camera = CameraSource::open(&settings.camera).context("Could not access the camera")?;
    let (width, height) = camera.resolution();
    info!(width, height, mirror = settings.camera.mirror, "Capturing");

    let sidecar = MediaPipeSidecar::spawn(&settings.landmarks).context("Could not start hand landmark detection")?;
    let executor = system::executor_for(settings.backend);

    let mut frame_loop = FrameLoop::new(Box::new(camera), Box::new(sidecar), executor, Box::new(SystemClock));

    if std::env::args().any(|arg| arg == "--headless") {
        let reason = frame_loop.run_until_stopped(|_| false);
        info!(?reason, frames = frame_loop.frames(), "Stopped");
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window.width, settings.window.height])
            .with_min_inner_size([480.0, 400.0]),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        &settings.window.title,
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(ui::create_visuals());
            Box::new(app::GestureVolumeApp::new(frame_loop))
        }),
    )
    .map_err(|e| anyhow!("Window closed with an error: {}", e))
}
