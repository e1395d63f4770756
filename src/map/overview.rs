//! Small inset map showing a wider area around the main view.

use egui::{vec2, Color32, Rect, Sense, Stroke, Ui};
use geo::{coord, Coord};

use super::map::{paint_tiles, TileSet};
use super::view::View;

pub const SIZE: f32 = 150.0;
/// How many zoom levels the inset sits above the main view.
pub const ZOOM_OFFSET: f64 = 4.0;

/// View the inset uses for a given main view.
pub fn overview_view(main: &View) -> View {
    View::new(main.center(), (main.zoom() - ZOOM_OFFSET).max(0.0))
}

/// Paint the inset in the lower right of `map_rect`, or just its expand
/// button when collapsed. Returns the new main-view center when the inset
/// was clicked.
pub fn show(ui: &mut Ui, map_rect: Rect, main: &View, collapsed: &mut bool, tiles: &mut TileSet<'_>) -> Option<Coord<f64>> {
    let area = Rect::from_min_size(map_rect.right_bottom() - vec2(SIZE + 8.0, SIZE + 24.0), vec2(SIZE, SIZE));
    let button = Rect::from_min_size(area.right_bottom() - vec2(22.0, 22.0), vec2(22.0, 22.0));
    if *collapsed {
        if ui.put(button, egui::Button::new("\u{ab}")).clicked() {
            *collapsed = false;
        }
        return None;
    }

    let view = overview_view(main);
    let painter = ui.painter().with_clip_rect(area);
    paint_tiles(ui.ctx(), &painter, area, &view, tiles);

    let extent = main.extent(map_rect);
    let outline = Rect::from_two_pos(
        view.to_screen(area, coord! { x: extent.min().x, y: extent.max().y }),
        view.to_screen(area, coord! { x: extent.max().x, y: extent.min().y }),
    );
    painter.rect_stroke(outline, 0.0, Stroke::new(1.5, Color32::from_rgb(0xee, 0x33, 0x33)));
    painter.rect_stroke(area, 0.0, Stroke::new(1.0, Color32::from_gray(60)));

    let response = ui.interact(area, ui.id().with("overview"), Sense::click());
    let clicked = response.interact_pointer_pos()
        .filter(|_| response.clicked())
        .map(|p| view.to_map(area, p));

    if ui.put(button, egui::Button::new("\u{bb}")).clicked() {
        *collapsed = true;
    }
    clicked
}
