use egui::{vec2, Align2, Color32, Id, Order, Rect, RichText, Sense};

use super::viewer::Popover;
use crate::data::density::ColorBucket;

/// Density swatches in the lower-left corner of the map, above the scale bar.
pub fn legend(ctx: &egui::Context, map_rect: Rect) {
    egui::Area::new(Id::new("legend"))
        .fixed_pos(map_rect.left_bottom() + vec2(8.0, -40.0))
        .pivot(Align2::LEFT_BOTTOM)
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(RichText::new("People / mi\u{b2}").strong());
                for bucket in ColorBucket::ALL {
                    ui.horizontal(|ui| {
                        let (swatch, _) = ui.allocate_exact_size(vec2(16.0, 16.0), Sense::hover());
                        ui.painter().rect_filled(swatch, 2.0, bucket.color());
                        ui.label(bucket.label());
                    });
                }
            });
        });
}

pub fn popover(ctx: &egui::Context, popover: &Popover) {
    egui::Area::new(Id::new("feature_popover"))
        .fixed_pos(popover.position)
        .order(Order::Tooltip)
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(RichText::new(&popover.name).strong().color(Color32::WHITE));
                ui.label(popover.density_text());
            });
        });
}
