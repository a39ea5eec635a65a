//! Overlay drawing.

use eframe::egui::{self, Color32, FontId, Vec2};

use super::state::Rgba;

const PADDING: Vec2 = Vec2::new(16.0, 10.0);
const MIN_SIZE: Vec2 = Vec2::new(96.0, 28.0);
const FONT_SIZE: f32 = 12.0;
const ROUNDING: f32 = 8.0;

fn color(rgba: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// Window size that fits `text` with padding.
pub fn fitted_size(ctx: &egui::Context, text: &str) -> Vec2 {
    let galley = ctx.fonts(|fonts| {
        fonts.layout_no_wrap(text.to_owned(), FontId::monospace(FONT_SIZE), Color32::WHITE)
    });
    (galley.size() + PADDING).max(MIN_SIZE).ceil()
}

/// Draws the rounded background and centered text over the whole window.
pub fn render_overlay(ctx: &egui::Context, text: &str, background: Rgba) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let rect = ui.max_rect();
            let painter = ui.painter();
            painter.rect_filled(rect, ROUNDING, color(background));
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                text,
                FontId::monospace(FONT_SIZE),
                Color32::BLACK,
            );
        });
}
