//! Viewer controller: owns the configuration, the full and filtered feature
//! collections, and the hover popover, and drives a [`MapSurface`].

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use egui::{vec2, Color32, ColorImage, Pos2, Stroke, Vec2};
use geo::{coord, Coord};

use crate::config::{DrawKind, ViewConfig, ViewUpdate};
use crate::data::feature::{Feature, FeatureCollection};
use crate::data::filter::{filter_by_density, parse_threshold};
use crate::map::map_tile::lon_lat_to_mercator;
use crate::map::surface::{FeatureStyle, MapSurface, PointerMove, TextStyle};
use crate::map::view::{elastic, AnimationTarget};

pub const INITIAL_CENTER: Coord<f64> = coord! { x: -11_542_437.750_890_903, y: 4_862_581.061_116_328 };
pub const INITIAL_ZOOM: f64 = 4.0;
/// Popover position relative to the pointer.
pub const POPUP_OFFSET: Vec2 = vec2(-48.0, -75.0);

const NEW_YORK: (f64, f64) = (-73.935242, 40.73061);
const FLY_ZOOM: f64 = 6.0;
const FLY_DURATION: Duration = Duration::from_millis(2000);

/// Fill by density tier, thin black outline, state name above the interior
/// point.
pub fn density_style(feature: &Feature) -> FeatureStyle {
    FeatureStyle {
        fill: feature.properties.bucket().color(),
        stroke: Stroke::new(0.5, Color32::BLACK),
        label: Some(TextStyle {
            text: feature.properties.name.clone(),
            size: 12.0,
            color: Color32::WHITE,
            offset: vec2(0.0, -10.0),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popover {
    pub position: Pos2,
    pub name: String,
    pub density: Option<f64>,
}

impl Popover {
    pub fn density_text(&self) -> String {
        match self.density {
            Some(density) => format!("Density: {}", density),
            None => "Density: n/a".to_string(),
        }
    }
}

pub struct Viewer {
    config: ViewConfig,
    full: FeatureCollection,
    filtered: FeatureCollection,
    search_text: String,
    /// Search stays inert until the first dataset arrives.
    loaded: bool,
    popover: Rc<RefCell<Option<Popover>>>,
    status: Rc<RefCell<Option<String>>>,
    export_dir: PathBuf,
}

impl Viewer {
    pub fn new(config: ViewConfig, export_dir: PathBuf) -> Self {
        Self {
            config,
            full: FeatureCollection::default(),
            filtered: FeatureCollection::default(),
            search_text: String::new(),
            loaded: false,
            popover: Rc::default(),
            status: Rc::default(),
            export_dir,
        }
    }

    /// Push the style, features, draw kind and hover listener to `surface`.
    pub fn install(&self, surface: &mut dyn MapSurface) {
        surface.set_style_function(Box::new(density_style));
        surface.set_feature_source(self.filtered.clone());
        surface.set_draw_kind(self.config.draw_kind);
        self.sync_pointer_listener(surface);
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn search_text_mut(&mut self) -> &mut String {
        &mut self.search_text
    }

    pub fn popover(&self) -> Option<Popover> {
        self.popover.borrow().clone()
    }

    pub fn status(&self) -> Option<String> {
        self.status.borrow().clone()
    }

    pub fn on_dataset_loaded(&mut self, result: Result<FeatureCollection>, surface: &mut dyn MapSurface) {
        match result {
            Ok(collection) => {
                if collection.is_empty() {
                    log::warn!("Dataset loaded with no features");
                } else {
                    log::info!("Loaded {} features", collection.len());
                }
                self.filtered = collection.clone();
                self.full = collection;
                self.loaded = true;
                surface.set_feature_source(self.filtered.clone());
                *self.status.borrow_mut() = None;
            }
            Err(e) => {
                log::error!("Dataset failed to load: {:#}", e);
                *self.status.borrow_mut() = Some(format!("Could not load dataset: {:#}", e));
            }
        }
    }

    /// Filter the full collection by the number in the search box.
    pub fn search(&mut self, surface: &mut dyn MapSurface) {
        if !self.loaded {
            log::debug!("Ignoring search before the dataset has loaded");
            return;
        }
        let threshold = parse_threshold(&self.search_text);
        self.filtered = filter_by_density(&self.full, threshold);
        log::info!("Density > {}: {} of {} features", threshold, self.filtered.len(), self.full.len());
        surface.set_feature_source(self.filtered.clone());
        self.config = self.config.apply(ViewUpdate::DensityThreshold(threshold));
    }

    pub fn update(&mut self, update: ViewUpdate, surface: &mut dyn MapSurface) {
        let next = self.config.apply(update);
        let kind_changed = next.draw_kind != self.config.draw_kind;
        self.config = next;
        if kind_changed {
            surface.set_draw_kind(self.config.draw_kind);
            self.sync_pointer_listener(surface);
        }
    }

    /// The popover only follows the pointer while nothing is being drawn.
    fn sync_pointer_listener(&self, surface: &mut dyn MapSurface) {
        if self.config.draw_kind != DrawKind::None {
            surface.on_pointer_move(None);
            *self.popover.borrow_mut() = None;
            return;
        }

        let popover = Rc::clone(&self.popover);
        surface.on_pointer_move(Some(Box::new(move |event: &PointerMove| {
            if let Some(feature) = &event.feature {
                log::trace!(
                    "Pointer over feature {} ({}) at {:?}",
                    feature.id,
                    feature.properties.name,
                    event.coordinate
                );
            }
            *popover.borrow_mut() = event.feature.as_ref().map(|feature| Popover {
                position: event.screen + POPUP_OFFSET,
                name: feature.properties.name.clone(),
                density: feature.properties.density,
            });
        })));
    }

    pub fn fly_to_new_york(&self, surface: &mut dyn MapSurface) {
        let target = AnimationTarget {
            center: lon_lat_to_mercator(NEW_YORK.0, NEW_YORK.1),
            zoom: FLY_ZOOM,
        };
        surface.animate_to(target, FLY_DURATION, elastic);
    }

    /// Capture the map and write it as a PNG into the export directory.
    pub fn export(&self, surface: &mut dyn MapSurface) {
        let dir = self.export_dir.clone();
        let status = Rc::clone(&self.status);
        surface.export_raster(Box::new(move |image| {
            let message = match save_png(&dir, &image, SystemTime::now()) {
                Ok(path) => {
                    log::info!("Exported map to {}", path.display());
                    format!("Saved {}", path.display())
                }
                Err(e) => {
                    log::error!("Export failed: {:#}", e);
                    format!("Export failed: {:#}", e)
                }
            };
            *status.borrow_mut() = Some(message);
        }));
    }
}

pub fn save_png(dir: &Path, image: &ColorImage, now: SystemTime) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let seconds = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
    let path = dir.join(format!("map-{}.png", seconds));

    let [width, height] = image.size;
    let bytes: Vec<u8> = image.pixels.iter().flat_map(|c| c.to_srgba_unmultiplied()).collect();
    let buffer = image::RgbaImage::from_raw(width as u32, height as u32, bytes)
        .context("screenshot size does not match its pixels")?;
    buffer.save(&path).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::feature::tests::square;
    use crate::map::surface::{PointerMoveFn, RasterFn, StyleFn};
    use crate::map::view::Easing;

    #[derive(Default)]
    struct RecordingSurface {
        style: Option<StyleFn>,
        sources: Vec<FeatureCollection>,
        draw_kinds: Vec<DrawKind>,
        pointer: Option<PointerMoveFn>,
        animations: Vec<(AnimationTarget, Duration, Easing)>,
        exports: Vec<RasterFn>,
    }

    impl MapSurface for RecordingSurface {
        fn set_style_function(&mut self, style: StyleFn) {
            self.style = Some(style);
        }

        fn set_feature_source(&mut self, features: FeatureCollection) {
            self.sources.push(features);
        }

        fn set_draw_kind(&mut self, kind: DrawKind) {
            self.draw_kinds.push(kind);
        }

        fn on_pointer_move(&mut self, callback: Option<PointerMoveFn>) {
            self.pointer = callback;
        }

        fn animate_to(&mut self, target: AnimationTarget, duration: Duration, easing: Easing) {
            self.animations.push((target, duration, easing));
        }

        fn export_raster(&mut self, done: RasterFn) {
            self.exports.push(done);
        }
    }

    impl RecordingSurface {
        fn densities(&self) -> Vec<Option<f64>> {
            self.sources.last().map_or_else(Vec::new, |c| c.iter().map(|f| f.properties.density).collect())
        }

        fn hover(&mut self, feature: Option<Arc<Feature>>) {
            let event = PointerMove { screen: Pos2::new(100.0, 100.0), coordinate: coord! { x: 0.0, y: 0.0 }, feature };
            (self.pointer.as_mut().expect("listener registered"))(&event);
        }
    }

    fn loaded(surface: &mut RecordingSurface) -> Viewer {
        let mut viewer = Viewer::new(ViewConfig::default(), std::env::temp_dir());
        viewer.install(surface);
        let collection = [
            square("a", Some(3.0), 0.0, 0.0, 1.0),
            square("b", Some(12.0), 2.0, 0.0, 1.0),
            square("c", Some(55.0), 4.0, 0.0, 1.0),
        ]
        .into_iter()
        .collect();
        viewer.on_dataset_loaded(Ok(collection), surface);
        viewer
    }

    fn search(viewer: &mut Viewer, surface: &mut RecordingSurface, text: &str) {
        *viewer.search_text_mut() = text.to_string();
        viewer.search(surface);
    }

    #[test]
    fn install_wires_the_surface() {
        let mut surface = RecordingSurface::default();
        let viewer = Viewer::new(ViewConfig::default(), PathBuf::from("."));
        viewer.install(&mut surface);

        assert!(surface.style.is_some());
        assert!(surface.pointer.is_some());
        assert_eq!(surface.draw_kinds, [DrawKind::None]);
        assert_eq!(surface.sources.len(), 1);
    }

    #[test]
    fn loaded_dataset_is_shown_unfiltered() {
        let mut surface = RecordingSurface::default();
        let viewer = loaded(&mut surface);
        assert_eq!(surface.densities(), [Some(3.0), Some(12.0), Some(55.0)]);
        assert_eq!(viewer.status(), None);
    }

    #[test]
    fn failed_dataset_sets_a_status_line() {
        let mut surface = RecordingSurface::default();
        let mut viewer = Viewer::new(ViewConfig::default(), PathBuf::from("."));
        viewer.on_dataset_loaded(Err(anyhow::anyhow!("connection refused")), &mut surface);
        assert!(viewer.status().is_some_and(|s| s.contains("connection refused")));
        assert!(surface.sources.is_empty());
    }

    #[test]
    fn search_filters_from_the_full_collection() {
        let mut surface = RecordingSurface::default();
        let mut viewer = loaded(&mut surface);

        search(&mut viewer, &mut surface, "50");
        assert_eq!(surface.densities(), [Some(55.0)]);
        search(&mut viewer, &mut surface, " 10 ");
        assert_eq!(surface.densities(), [Some(12.0), Some(55.0)]);
        assert_eq!(viewer.config().density_threshold, Some(10.0));

        search(&mut viewer, &mut surface, "100");
        assert!(surface.densities().is_empty());
    }

    #[test]
    fn search_before_load_is_ignored() {
        let mut surface = RecordingSurface::default();
        let mut viewer = Viewer::new(ViewConfig::default(), std::env::temp_dir());
        viewer.install(&mut surface);
        search(&mut viewer, &mut surface, "50");
        assert_eq!(surface.sources.len(), 1);
        assert_eq!(viewer.config().density_threshold, None);

        let collection = [
            square("a", Some(3.0), 0.0, 0.0, 1.0),
            square("b", Some(12.0), 2.0, 0.0, 1.0),
            square("c", Some(55.0), 4.0, 0.0, 1.0),
        ]
        .into_iter()
        .collect();
        viewer.on_dataset_loaded(Ok(collection), &mut surface);
        assert_eq!(surface.densities(), [Some(3.0), Some(12.0), Some(55.0)]);
    }

    #[test]
    fn unparsable_search_shows_nothing() {
        let mut surface = RecordingSurface::default();
        let mut viewer = loaded(&mut surface);
        search(&mut viewer, &mut surface, "ten");
        assert!(surface.densities().is_empty());
        assert!(viewer.config().density_threshold.is_some_and(f64::is_nan));
    }

    #[test]
    fn hovering_a_feature_opens_the_popover() {
        let mut surface = RecordingSurface::default();
        let viewer = loaded(&mut surface);

        surface.hover(Some(square("Texas", Some(40.5), 0.0, 0.0, 1.0)));
        let popover = viewer.popover().unwrap();
        assert_eq!(popover.name, "Texas");
        assert_eq!(popover.density_text(), "Density: 40.5");
        assert_eq!(popover.position, Pos2::new(52.0, 25.0));

        surface.hover(None);
        assert_eq!(viewer.popover(), None);
    }

    #[test]
    fn drawing_disables_the_popover() {
        let mut surface = RecordingSurface::default();
        let mut viewer = loaded(&mut surface);
        surface.hover(Some(square("Ohio", Some(100.0), 0.0, 0.0, 1.0)));

        viewer.update(ViewUpdate::DrawKind(DrawKind::Polygon), &mut surface);
        assert!(surface.pointer.is_none());
        assert_eq!(viewer.popover(), None);
        assert_eq!(surface.draw_kinds.last(), Some(&DrawKind::Polygon));

        viewer.update(ViewUpdate::DrawKind(DrawKind::None), &mut surface);
        assert!(surface.pointer.is_some());
    }

    #[test]
    fn other_updates_leave_the_surface_alone() {
        let mut surface = RecordingSurface::default();
        let mut viewer = loaded(&mut surface);
        let kinds = surface.draw_kinds.len();
        viewer.update(ViewUpdate::Legend(false), &mut surface);
        assert!(!viewer.config().legend_on);
        assert_eq!(surface.draw_kinds.len(), kinds);
    }

    #[test]
    fn fly_to_new_york_uses_elastic_easing() {
        let mut surface = RecordingSurface::default();
        let viewer = loaded(&mut surface);
        viewer.fly_to_new_york(&mut surface);

        let (target, duration, easing) = surface.animations[0];
        approx::assert_abs_diff_eq!(target.center.x, -8_230_433.49, epsilon = 0.01);
        assert_eq!(target.zoom, 6.0);
        assert_eq!(duration, Duration::from_millis(2000));
        approx::assert_abs_diff_eq!(easing(0.2), elastic(0.2));
    }

    #[test]
    fn density_style_uses_the_classifier() {
        let feature = square("Utah", Some(34.3), 0.0, 0.0, 1.0);
        let style = density_style(&feature);
        assert_eq!(style.fill, Color32::from_rgb(0x1D, 0x36, 0x5C));
        assert_eq!(style.stroke, Stroke::new(0.5, Color32::BLACK));
        let label = style.label.unwrap();
        assert_eq!(label.text, "Utah");
        assert_eq!(label.offset, vec2(0.0, -10.0));
    }

    #[test]
    fn export_writes_a_png() {
        let dir = std::env::temp_dir().join(format!("densitymap-export-{}", std::process::id()));
        let mut surface = RecordingSurface::default();
        let viewer = Viewer::new(ViewConfig::default(), dir.clone());
        viewer.export(&mut surface);

        let done = surface.exports.pop().unwrap();
        done(ColorImage::new([4, 3], Color32::RED));

        let status = viewer.status().unwrap();
        assert!(status.starts_with("Saved"), "{}", status);
        let written: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(written.len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
