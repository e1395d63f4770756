use std::sync::Arc;
use std::time::Duration;

use egui::{Color32, Pos2, Stroke, Vec2};
use geo::Coord;

use super::view::{AnimationTarget, Easing};
use crate::config::DrawKind;
use crate::data::feature::{Feature, FeatureCollection};

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub text: String,
    pub size: f32,
    pub color: Color32,
    pub offset: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub fill: Color32,
    pub stroke: Stroke,
    pub label: Option<TextStyle>,
}

pub type StyleFn = Box<dyn Fn(&Feature) -> FeatureStyle>;

/// Pointer position over the map, with the feature under it if any.
#[derive(Debug, Clone)]
pub struct PointerMove {
    pub screen: Pos2,
    pub coordinate: Coord<f64>,
    pub feature: Option<Arc<Feature>>,
}

pub type PointerMoveFn = Box<dyn FnMut(&PointerMove)>;

/// Receives the rendered map area once the next frame has been captured.
pub type RasterFn = Box<dyn FnOnce(egui::ColorImage)>;

/// What the viewer needs from the widget that actually draws the map.
pub trait MapSurface {
    /// Style applied to every feature on each paint.
    fn set_style_function(&mut self, style: StyleFn);

    /// Replace the displayed features wholesale.
    fn set_feature_source(&mut self, features: FeatureCollection);

    /// Install the draw interaction for `kind`; `DrawKind::None` removes it.
    fn set_draw_kind(&mut self, kind: DrawKind);

    /// Register the pointer-move listener, or remove it with `None`.
    fn on_pointer_move(&mut self, callback: Option<PointerMoveFn>);

    fn animate_to(&mut self, target: AnimationTarget, duration: Duration, easing: Easing);

    /// Capture the map area as an image. `done` runs when the capture
    /// arrives, which is at the earliest the next frame.
    fn export_raster(&mut self, done: RasterFn);
}
