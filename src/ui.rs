// src/ui.rs - Camera preview with hand skeleton and gesture overlay
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use image::RgbImage;
use nalgebra::Vector3;

use gesture_volume::controller::{RenderHints, Tone};
use gesture_volume::tracking::{landmarks, HandLandmarks, HAND_CONNECTIONS};

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color32,
    pub surface: Color32,
    pub raise: Color32,
    pub lower: Color32,
    pub warning: Color32,
    pub bone: Color32,
    pub joint: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(20, 20, 25),
            surface: Color32::from_rgb(30, 30, 35),
            raise: Color32::from_rgb(76, 175, 80),
            lower: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(244, 67, 54),
            bone: Color32::from_rgb(70, 130, 240),
            joint: Color32::from_rgb(255, 152, 0),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

impl Theme {
    pub fn tone_color(&self, tone: Tone) -> Color32 {
        match tone {
            Tone::Raise => self.raise,
            Tone::Lower => self.lower,
            Tone::Warning => self.warning,
            Tone::Neutral => self.text_secondary,
        }
    }
}

/// Maps a normalized landmark (0..1 in both axes) into screen space.
pub fn project(point: &Vector3<f64>, rect: Rect) -> Pos2 {
    Pos2::new(
        rect.left() + point.x as f32 * rect.width(),
        rect.top() + point.y as f32 * rect.height(),
    )
}

/// Largest size with the given aspect ratio that fits in `available`.
pub fn fit_to_aspect(available: Vec2, aspect_ratio: f32) -> Vec2 {
    if available.x <= 0.0 || available.y <= 0.0 || aspect_ratio <= 0.0 {
        return Vec2::ZERO;
    }
    if available.x / available.y > aspect_ratio {
        Vec2::new(available.y * aspect_ratio, available.y)
    } else {
        Vec2::new(available.x, available.x / aspect_ratio)
    }
}

pub struct VideoWidget {
    texture: Option<egui::TextureHandle>,
    aspect_ratio: f32,
}

impl VideoWidget {
    pub fn new() -> Self {
        Self {
            texture: None,
            aspect_ratio: 4.0 / 3.0,
        }
    }

    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &RgbImage) {
        let size = [frame.width() as usize, frame.height() as usize];
        let color_image = egui::ColorImage::from_rgb(size, frame.as_raw());
        if frame.height() > 0 {
            self.aspect_ratio = frame.width() as f32 / frame.height() as f32;
        }

        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("camera_frame", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }

    /// Paints the latest frame and returns where it landed, for overlays.
    pub fn show(&self, ui: &mut egui::Ui) -> Rect {
        let size = fit_to_aspect(ui.available_size(), self.aspect_ratio);
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

        if let Some(texture) = &self.texture {
            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        } else {
            ui.painter().rect_filled(rect, egui::Rounding::same(4.0), Color32::from_rgb(50, 50, 55));
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No Video Signal",
                egui::FontId::proportional(16.0),
                Color32::from_rgb(150, 150, 155),
            );
        }
        rect
    }
}

pub fn draw_hand_skeleton(painter: &egui::Painter, rect: Rect, hand: &HandLandmarks, theme: &Theme) {
    for (from, to) in HAND_CONNECTIONS {
        painter.line_segment(
            [project(hand.point(from), rect), project(hand.point(to), rect)],
            Stroke::new(2.0, theme.bone),
        );
    }

    for point in hand.points() {
        painter.circle_filled(project(point, rect), 4.0, theme.joint);
    }

    if !hand.handedness.is_empty() {
        let wrist = project(hand.point(landmarks::WRIST), rect);
        painter.text(
            wrist + Vec2::new(0.0, 12.0),
            egui::Align2::CENTER_TOP,
            format!("{} {:.0}%", hand.handedness, hand.score * 100.0),
            egui::FontId::proportional(12.0),
            theme.text_secondary,
        );
    }
}

/// Status line, countdown and per-hand fingertip heights in the top-left corner.
pub fn draw_status(painter: &egui::Painter, rect: Rect, hints: &RenderHints, theme: &Theme) {
    let mut cursor = rect.left_top() + Vec2::new(12.0, 12.0);

    painter.text(
        cursor,
        egui::Align2::LEFT_TOP,
        format!("Gesture: {}", hints.gesture.label()),
        egui::FontId::proportional(16.0),
        theme.text_primary,
    );
    cursor.y += 24.0;

    if let Some(status) = &hints.status {
        let size = if hints.countdown.is_some() { 28.0 } else { 20.0 };
        painter.text(
            cursor,
            egui::Align2::LEFT_TOP,
            status,
            egui::FontId::proportional(size),
            theme.tone_color(hints.tone),
        );
        cursor.y += size + 8.0;
    }

    for line in &hints.fingertips {
        painter.text(
            cursor,
            egui::Align2::LEFT_TOP,
            line,
            egui::FontId::monospace(11.0),
            theme.text_secondary,
        );
        cursor.y += 16.0;
    }
}

pub fn draw_volume_bar(ui: &mut egui::Ui, volume_percent: u8, tone: Tone, theme: &Theme) {
    ui.horizontal(|ui| {
        ui.label("Volume");

        let bar_width = 240.0;
        let bar_height = 20.0;
        let rect = ui.allocate_space(Vec2::new(bar_width, bar_height)).1;
        let painter = ui.painter();

        painter.rect_filled(rect, egui::Rounding::same(4.0), theme.surface);

        let fill = Rect::from_min_size(
            rect.min,
            Vec2::new(bar_width * f32::from(volume_percent) / 100.0, bar_height),
        );
        let color = match tone {
            Tone::Neutral | Tone::Warning => theme.bone,
            active => theme.tone_color(active),
        };
        painter.rect_filled(fill, egui::Rounding::same(4.0), color);

        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            format!("{}%", volume_percent),
            egui::FontId::proportional(12.0),
            theme.text_primary,
        );
    });
}

pub fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.panel_fill = Color32::from_rgb(20, 20, 25);
    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(30, 30, 35);
    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.window_rounding = egui::Rounding::same(12.0);

    visuals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_normalized_points_into_rect() {
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(200.0, 100.0));

        assert_eq!(project(&Vector3::new(0.0, 0.0, 0.0), rect), Pos2::new(10.0, 20.0));
        assert_eq!(project(&Vector3::new(1.0, 1.0, 0.3), rect), Pos2::new(210.0, 120.0));
        assert_eq!(project(&Vector3::new(0.5, 0.25, 0.0), rect), Pos2::new(110.0, 45.0));
    }

    #[test]
    fn fits_frame_inside_panel() {
        assert_eq!(fit_to_aspect(Vec2::new(800.0, 300.0), 4.0 / 3.0), Vec2::new(400.0, 300.0));
        assert_eq!(fit_to_aspect(Vec2::new(400.0, 900.0), 2.0), Vec2::new(400.0, 200.0));
        assert_eq!(fit_to_aspect(Vec2::new(0.0, 900.0), 2.0), Vec2::ZERO);
    }

    #[test]
    fn raise_is_green_and_lower_is_red() {
        let theme = Theme::default();

        assert_eq!(theme.tone_color(Tone::Raise), Color32::from_rgb(76, 175, 80));
        assert_eq!(theme.tone_color(Tone::Lower), Color32::from_rgb(244, 67, 54));
        assert_eq!(theme.tone_color(Tone::Warning), theme.tone_color(Tone::Lower));
        assert_eq!(theme.tone_color(Tone::Neutral), theme.text_secondary);
    }
}
