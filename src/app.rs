// src/app.rs
use eframe::egui;
use tracing::info;

use gesture_volume::controller::{RenderHints, Tone};
use gesture_volume::frame_loop::{FrameLoop, StopReason, Tick};
use gesture_volume::tracking::{Gesture, HandLandmarks};
use crate::ui::{self, Theme, VideoWidget};

pub struct GestureVolumeApp {
    frame_loop: FrameLoop,
    video: VideoWidget,
    theme: Theme,

    // Latest processed frame
    hands: Vec<HandLandmarks>,
    hints: RenderHints,

    stop_reason: Option<StopReason>,
}

impl GestureVolumeApp {
    pub fn new(frame_loop: FrameLoop) -> Self {
        let volume_percent = frame_loop.state().volume.get();
        Self {
            frame_loop,
            video: VideoWidget::new(),
            theme: Theme::default(),
            hands: Vec::new(),
            hints: RenderHints {
                gesture: Gesture::None,
                countdown: None,
                volume_percent,
                status: None,
                tone: Tone::Neutral,
                fingertips: Vec::new(),
            },
            stop_reason: None,
        }
    }

    fn advance(&mut self, ctx: &egui::Context) {
        if !self.frame_loop.is_stopped() && ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            self.frame_loop.request_quit();
        }

        match self.frame_loop.tick() {
            Tick::Frame(report) => {
                self.video.update_frame(ctx, &report.frame);
                self.hands = report.hands;
                self.hints = report.hints;
            }
            Tick::Stopped(reason) => {
                if self.stop_reason.is_none() {
                    info!(?reason, "Closing window");
                    self.stop_reason = Some(reason);
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
    }

    fn render_footer(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui::draw_volume_bar(ui, self.hints.volume_percent, self.hints.tone, &self.theme);
                ui.separator();
                ui.label(format!("Frames: {}", self.frame_loop.frames()));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(self.theme.text_secondary, "Press Q to quit");
                });
            });
            ui.add_space(6.0);
        });
    }

    fn render_video_panel(&self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.background))
            .show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    let rect = self.video.show(ui);
                    let painter = ui.painter_at(rect);

                    for hand in &self.hands {
                        ui::draw_hand_skeleton(&painter, rect, hand, &self.theme);
                    }
                    ui::draw_status(&painter, rect, &self.hints, &self.theme);
                });
            });
    }
}

impl eframe::App for GestureVolumeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.advance(ctx);

        self.render_footer(ctx);
        self.render_video_panel(ctx);

        ctx.request_repaint();
    }
}
