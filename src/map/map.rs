use std::time::Duration;

use egui::{pos2, vec2, Align2, Color32, FontId, Mesh, Painter, Pos2, Rect, Response, Sense, Shape, Stroke, Ui, Widget};
use geo::{coord, Coord, LineString, Polygon, TriangulateEarcut};
use lru::LruCache;

use super::draw::{DrawLayer, DrawnShape, PIXEL_TOLERANCE};
use super::hit_test::FeatureIndex;
use super::map_tile::{mercator_to_lon_lat, tile_extent, tile_zoom, tiles_covering, MapTile, TileKey, MAX_ZOOM, MIN_ZOOM};
use super::overview;
use super::scale_line::scale_bar;
use super::surface::{FeatureStyle, MapSurface, PointerMove, PointerMoveFn, RasterFn, StyleFn};
use super::view::{AnimationTarget, Easing, View};
use crate::config::{DrawKind, ViewConfig};
use crate::data::feature::{Feature, FeatureCollection};

const DRAW_GREEN: Color32 = Color32::from_rgb(0x2e, 0xca, 0x6f);
const DRAW_FILL: Color32 = Color32::from_rgba_premultiplied(51, 51, 51, 51);
const CONTROL_SIZE: f32 = 24.0;
const MARGIN: f32 = 8.0;

fn plain_style(_: &Feature) -> FeatureStyle {
    FeatureStyle {
        fill: Color32::from_gray(160),
        stroke: Stroke::new(0.5, Color32::BLACK),
        label: None,
    }
}

/// Everything the map widget keeps between frames.
pub struct MapState {
    view: View,
    features: FeatureCollection,
    index: FeatureIndex,
    style: StyleFn,
    pointer_move: Option<PointerMoveFn>,
    last_pointer: Option<Pos2>,
    draw: DrawLayer,
    pending_export: Option<RasterFn>,
    screenshot_requested: bool,
    overview_collapsed: bool,
}

impl MapState {
    pub fn new(view: View) -> Self {
        Self {
            view,
            features: FeatureCollection::default(),
            index: FeatureIndex::default(),
            style: Box::new(plain_style),
            pointer_move: None,
            last_pointer: None,
            draw: DrawLayer::default(),
            pending_export: None,
            screenshot_requested: false,
            overview_collapsed: false,
        }
    }
}

impl MapSurface for MapState {
    fn set_style_function(&mut self, style: StyleFn) {
        self.style = style;
    }

    fn set_feature_source(&mut self, features: FeatureCollection) {
        self.index = FeatureIndex::build(&features);
        self.features = features;
        // Re-run hit testing against the new features on the next frame.
        self.last_pointer = None;
    }

    fn set_draw_kind(&mut self, kind: DrawKind) {
        self.draw.set_kind(kind);
    }

    fn on_pointer_move(&mut self, callback: Option<PointerMoveFn>) {
        self.pointer_move = callback;
        self.last_pointer = None;
    }

    fn animate_to(&mut self, target: AnimationTarget, duration: Duration, easing: Easing) {
        self.view.animate(target, duration, easing);
    }

    fn export_raster(&mut self, done: RasterFn) {
        self.pending_export = Some(done);
        self.screenshot_requested = false;
    }
}

/// Tile cache plus the list the widget fills with tiles it could not find.
pub struct TileSet<'a> {
    pub cache: &'a mut LruCache<TileKey, MapTile>,
    pub missing: &'a mut Vec<TileKey>,
}

pub struct Map<'a> {
    state: &'a mut MapState,
    basemap: TileSet<'a>,
    overview: Option<TileSet<'a>>,
    config: &'a ViewConfig,
    loading: bool,
}

impl<'a> Widget for Map<'a> {
    fn ui(self, ui: &mut Ui) -> Response {
        let Map { state, mut basemap, overview, config, loading } = self;

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter().with_clip_rect(rect);

        if state.view.tick(ui.input(|i| i.time)) {
            ui.ctx().request_repaint();
        }

        handle_input(ui, &response, rect, state);

        paint_tiles(ui.ctx(), &painter, rect, &state.view, &mut basemap);
        paint_features(&painter, rect, state);
        paint_drawings(&painter, rect, state, response.hover_pos());

        notify_pointer(&response, rect, state);

        paint_controls(ui, rect, state, config);
        if let (true, Some(mut tiles)) = (config.overview_map_on, overview) {
            if let Some(center) = overview::show(ui, rect, &state.view, &mut state.overview_collapsed, &mut tiles) {
                log::debug!("Overview recentered on {:?}", mercator_to_lon_lat(center));
                state.view.cancel_animation();
                state.view.set_center(center);
            }
        }

        if loading {
            egui::Spinner::new().size(32.0).paint_at(ui, Rect::from_center_size(rect.center(), vec2(32.0, 32.0)));
        }

        capture_export(ui, rect, state);

        response
    }
}

impl<'a> Map<'a> {
    pub fn new(state: &'a mut MapState, basemap: TileSet<'a>, config: &'a ViewConfig) -> Self {
        Self { state, basemap, overview: None, config, loading: false }
    }

    pub fn overview(mut self, tiles: TileSet<'a>) -> Self {
        self.overview = Some(tiles);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }
}

fn handle_input(ui: &Ui, response: &Response, rect: Rect, state: &mut MapState) {
    let tolerance = PIXEL_TOLERANCE * state.view.resolution();

    if response.drag_started() {
        if let Some(p) = response.interact_pointer_pos() {
            let grabbed = state.draw.grab(state.view.to_map(rect, p), tolerance);
            if !grabbed {
                state.view.cancel_animation();
            }
        }
    }
    if response.dragged() {
        if state.draw.is_grabbing() {
            if let Some(p) = response.interact_pointer_pos() {
                state.draw.drag_to(state.view.to_map(rect, p));
            }
        } else {
            state.view.pan_pixels(response.drag_delta());
        }
    }
    if response.drag_stopped() {
        state.draw.release();
    }

    if let Some(p) = response.interact_pointer_pos() {
        let c = state.view.to_map(rect, p);
        if response.double_clicked() {
            state.draw.double_click(c, tolerance);
        } else if response.clicked() {
            state.draw.click(c, tolerance);
        }
    }

    if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
        state.draw.cancel();
    }

    if let Some(anchor) = response.hover_pos() {
        let anchor = state.view.to_map(rect, anchor);

        // Pinch first, wheel otherwise
        let pinch = ui.input(|i| i.zoom_delta());
        let scroll = ui.input(|i| i.smooth_scroll_delta).y;
        if (pinch - 1.0).abs() > f32::EPSILON {
            state.view.cancel_animation();
            state.view.zoom_around((pinch as f64).log2(), anchor);
        } else if scroll.abs() > f32::EPSILON {
            state.view.cancel_animation();
            state.view.zoom_around((scroll as f64 / 50.0).tanh(), anchor);
        }
    }
}

pub(crate) fn paint_tiles(ctx: &egui::Context, painter: &Painter, rect: Rect, view: &View, tiles: &mut TileSet<'_>) {
    let full_uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
    for key in tiles_covering(view.extent(rect), tile_zoom(view.zoom())) {
        let extent = tile_extent(key);
        let tile_rect = Rect::from_two_pos(
            view.to_screen(rect, coord! { x: extent.min().x, y: extent.max().y }),
            view.to_screen(rect, coord! { x: extent.max().x, y: extent.min().y }),
        );
        match tiles.cache.get_mut(&key) {
            Some(tile) => {
                painter.image(tile.texture(ctx).id(), tile_rect, full_uv, Color32::WHITE);
            }
            None => {
                tiles.missing.push(key);
                painter.rect_filled(tile_rect, 0.0, Color32::GRAY);
            }
        }
    }
}

fn push_triangles<'t>(mesh: &mut Mesh, triangles: impl IntoIterator<Item = &'t [Coord<f64>; 3]>, to_screen: impl Fn(Coord<f64>) -> Pos2, color: Color32) {
    for triangle in triangles {
        let base = mesh.vertices.len() as u32;
        for &c in triangle {
            mesh.colored_vertex(to_screen(c), color);
        }
        mesh.add_triangle(base, base + 1, base + 2);
    }
}

fn paint_features(painter: &Painter, rect: Rect, state: &MapState) {
    let view = &state.view;
    let extent = view.extent(rect);
    let to_screen = |c: Coord<f64>| view.to_screen(rect, c);

    let mut mesh = Mesh::default();
    let mut outlines = Vec::new();
    let mut labels = Vec::new();

    for feature in &state.features {
        let b = feature.bounds;
        if b.max().x < extent.min().x || b.min().x > extent.max().x || b.max().y < extent.min().y || b.min().y > extent.max().y {
            continue;
        }

        let style = (state.style)(feature);
        push_triangles(&mut mesh, &feature.triangles, to_screen, style.fill);
        for polygon in feature.geometry.iter() {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                outlines.push(Shape::closed_line(ring.coords().map(|&c| to_screen(c)).collect(), style.stroke));
            }
        }
        if let Some(label) = style.label {
            labels.push((to_screen(feature.label_anchor) + label.offset, label));
        }
    }

    painter.add(Shape::mesh(mesh));
    painter.extend(outlines);
    for (pos, label) in labels {
        painter.text(pos, Align2::CENTER_CENTER, label.text, FontId::proportional(label.size), label.color);
    }
}

fn paint_drawings(painter: &Painter, rect: Rect, state: &MapState, hover: Option<Pos2>) {
    let view = &state.view;
    let to_screen = |c: Coord<f64>| view.to_screen(rect, c);
    let stroke = Stroke::new(2.0, DRAW_GREEN);
    let pixels = |meters: f64| (meters / view.resolution()) as f32;

    for shape in state.draw.shapes() {
        match shape {
            DrawnShape::Point(c) => {
                painter.circle_filled(to_screen(*c), 7.0, DRAW_GREEN);
            }
            DrawnShape::LineString(vertices) => {
                painter.add(Shape::line(vertices.iter().map(|&c| to_screen(c)).collect(), stroke));
            }
            DrawnShape::Polygon(vertices) => {
                let polygon = Polygon::new(LineString::from(vertices.clone()), vec![]);
                let triangles: Vec<[Coord<f64>; 3]> = polygon.earcut_triangles().iter().map(|t| t.to_array()).collect();
                let mut mesh = Mesh::default();
                push_triangles(&mut mesh, &triangles, to_screen, DRAW_FILL);
                painter.add(Shape::mesh(mesh));
                painter.add(Shape::closed_line(vertices.iter().map(|&c| to_screen(c)).collect(), stroke));
            }
            DrawnShape::Circle { center, radius } => {
                painter.circle(to_screen(*center), pixels(*radius), DRAW_FILL, stroke);
            }
        }
    }

    let kind = state.draw.kind();
    if kind == DrawKind::None {
        return;
    }

    let tolerance = PIXEL_TOLERANCE * view.resolution();
    let cursor = hover.map(|p| state.draw.snap(view.to_map(rect, p), tolerance));
    let sketch = state.draw.sketch();
    match (kind, sketch.first(), cursor) {
        (DrawKind::Circle, Some(&center), Some(cursor)) => {
            let radius = (center.x - cursor.x).hypot(center.y - cursor.y);
            painter.circle(to_screen(center), pixels(radius), DRAW_FILL, stroke);
        }
        (DrawKind::LineString | DrawKind::Polygon, Some(_), _) => {
            let points: Vec<Pos2> = sketch.iter().copied().chain(cursor).map(to_screen).collect();
            painter.add(Shape::line(points, stroke));
        }
        _ => {}
    }
    for &c in sketch {
        painter.circle_filled(to_screen(c), 4.0, DRAW_GREEN);
    }
    if let Some(cursor) = cursor {
        painter.circle(to_screen(cursor), 5.0, Color32::TRANSPARENT, stroke);
    }
}

fn notify_pointer(response: &Response, rect: Rect, state: &mut MapState) {
    let Some(callback) = state.pointer_move.as_mut() else { return };

    match (response.hover_pos(), state.last_pointer) {
        (Some(screen), last) if last != Some(screen) => {
            let coordinate = state.view.to_map(rect, screen);
            let feature = state.index
                .feature_at(&state.features, coordinate)
                .and_then(|i| state.features.get(i))
                .cloned();
            callback(&PointerMove { screen, coordinate, feature });
            state.last_pointer = Some(screen);
        }
        (None, Some(screen)) => {
            let coordinate = state.view.to_map(rect, screen);
            callback(&PointerMove { screen, coordinate, feature: None });
            state.last_pointer = None;
        }
        _ => {}
    }
}

fn paint_controls(ui: &mut Ui, rect: Rect, state: &mut MapState, config: &ViewConfig) {
    let button = vec2(CONTROL_SIZE, CONTROL_SIZE);
    let top_left = rect.left_top() + vec2(MARGIN, MARGIN);

    if ui.put(Rect::from_min_size(top_left, button), egui::Button::new("+")).clicked() {
        state.view.cancel_animation();
        state.view.set_zoom(state.view.zoom().round() + 1.0);
    }
    let minus = top_left + vec2(0.0, CONTROL_SIZE + 2.0);
    if ui.put(Rect::from_min_size(minus, button), egui::Button::new("-")).clicked() {
        state.view.cancel_animation();
        state.view.set_zoom(state.view.zoom().round() - 1.0);
    }

    if config.zoom_slider_on {
        let slider_rect = Rect::from_min_size(minus + vec2(0.0, CONTROL_SIZE + MARGIN), vec2(CONTROL_SIZE, 160.0));
        let mut zoom = state.view.zoom();
        let slider = egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM).vertical().show_value(false);
        if ui.put(slider_rect, slider).changed() {
            state.view.cancel_animation();
            state.view.set_zoom(zoom);
        }
    }

    let fullscreen = Rect::from_min_size(rect.right_top() + vec2(-MARGIN - 80.0, MARGIN), vec2(80.0, CONTROL_SIZE));
    if ui.put(fullscreen, egui::Button::new("Full screen")).clicked() {
        toggle_fullscreen(ui.ctx());
    }

    let painter = ui.painter().with_clip_rect(rect);
    if let Some(bar) = scale_bar(state.view.resolution(), state.view.center(), config.scale_unit) {
        let left = rect.left_bottom() + vec2(MARGIN, -MARGIN);
        let right = left + vec2(bar.width, 0.0);
        let background = Rect::from_min_max(left - vec2(4.0, 22.0), right + vec2(4.0, 4.0));
        painter.rect_filled(background, 2.0, Color32::from_white_alpha(180));
        let stroke = Stroke::new(1.5, Color32::BLACK);
        painter.line_segment([left, right], stroke);
        painter.line_segment([left, left - vec2(0.0, 5.0)], stroke);
        painter.line_segment([right, right - vec2(0.0, 5.0)], stroke);
        painter.text(pos2((left.x + right.x) / 2.0, left.y - 6.0), Align2::CENTER_BOTTOM, bar.label, FontId::proportional(12.0), Color32::BLACK);
    }

    painter.text(
        rect.right_bottom() - vec2(4.0, 2.0),
        Align2::RIGHT_BOTTOM,
        "\u{a9} OpenStreetMap contributors",
        FontId::proportional(11.0),
        Color32::DARK_GRAY,
    );
}

/// Flip the window between fullscreen and decorated.
pub fn toggle_fullscreen(ctx: &egui::Context) {
    let fullscreen = !ctx.input(|i| i.viewport().fullscreen.unwrap_or(false));
    ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(fullscreen));
    ctx.send_viewport_cmd(egui::ViewportCommand::Decorations(!fullscreen));
    ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
}

fn capture_export(ui: &Ui, rect: Rect, state: &mut MapState) {
    if state.pending_export.is_none() {
        return;
    }
    if !state.screenshot_requested {
        ui.ctx().send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
        state.screenshot_requested = true;
        return;
    }

    let screenshot = ui.input(|i| {
        i.events.iter().find_map(|event| match event {
            egui::Event::Screenshot { image, .. } => Some(image.clone()),
            _ => None,
        })
    });
    if let Some(image) = screenshot {
        state.screenshot_requested = false;
        if let Some(done) = state.pending_export.take() {
            done(image.region(&rect, Some(ui.ctx().pixels_per_point())));
        }
    }
}
