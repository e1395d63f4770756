use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DATASET_URL: &str = "https://openlayers.org/data/vector/us-states.json";
pub const DEFAULT_TILE_URL: &str = "https://{a-c}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const DEFAULT_TILE_CACHE: usize = 512;
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleUnit {
    Degrees,
    Imperial,
    Us,
    Nautical,
    #[default]
    Metric,
}

impl ScaleUnit {
    pub const ALL: [ScaleUnit; 5] = [
        ScaleUnit::Degrees,
        ScaleUnit::Imperial,
        ScaleUnit::Us,
        ScaleUnit::Nautical,
        ScaleUnit::Metric,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScaleUnit::Degrees => "Degrees",
            ScaleUnit::Imperial => "Imperial inch",
            ScaleUnit::Us => "Us inch",
            ScaleUnit::Nautical => "Nautical mile",
            ScaleUnit::Metric => "Metric",
        }
    }
}

/// Geometry drawn by clicks on the map. `None` disables drawing and turns
/// on the hover popover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawKind {
    #[default]
    None,
    Point,
    LineString,
    Polygon,
    Circle,
}

impl DrawKind {
    pub const ALL: [DrawKind; 5] = [
        DrawKind::None,
        DrawKind::Point,
        DrawKind::LineString,
        DrawKind::Polygon,
        DrawKind::Circle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DrawKind::None => "None",
            DrawKind::Point => "Point",
            DrawKind::LineString => "Line",
            DrawKind::Polygon => "Polygon",
            DrawKind::Circle => "Circle",
        }
    }
}

/// Everything the user can toggle in the control panel. A value is never
/// edited in place; [`ViewConfig::apply`] returns the next configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub sidebar_open: bool,
    pub zoom_slider_on: bool,
    pub overview_map_on: bool,
    pub legend_on: bool,
    pub scale_unit: ScaleUnit,
    pub draw_kind: DrawKind,
    /// Last submitted search value. Not persisted: the dataset is refetched
    /// unfiltered on every start.
    #[serde(skip)]
    pub density_threshold: Option<f64>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            zoom_slider_on: false,
            overview_map_on: false,
            legend_on: true,
            scale_unit: ScaleUnit::Metric,
            draw_kind: DrawKind::None,
            density_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewUpdate {
    SidebarOpen(bool),
    ZoomSlider(bool),
    OverviewMap(bool),
    Legend(bool),
    ScaleUnit(ScaleUnit),
    DrawKind(DrawKind),
    DensityThreshold(f64),
}

impl ViewConfig {
    #[must_use]
    pub fn apply(&self, update: ViewUpdate) -> Self {
        let mut next = self.clone();
        match update {
            ViewUpdate::SidebarOpen(open) => next.sidebar_open = open,
            ViewUpdate::ZoomSlider(on) => next.zoom_slider_on = on,
            ViewUpdate::OverviewMap(on) => next.overview_map_on = on,
            ViewUpdate::Legend(on) => next.legend_on = on,
            ViewUpdate::ScaleUnit(unit) => next.scale_unit = unit,
            ViewUpdate::DrawKind(kind) => next.draw_kind = kind,
            ViewUpdate::DensityThreshold(threshold) => next.density_threshold = Some(threshold),
        }
        next
    }
}

fn default_cache_size() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_TILE_CACHE).unwrap_or(NonZeroUsize::MIN)
}

/// Start-up settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub dataset_url: String,
    pub basemap_tile_url: String,
    pub overview_tile_url: String,
    pub tile_cache_size: NonZeroUsize,
    pub export_dir: PathBuf,
    pub user_agent: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| dotenv::var(key).ok().filter(|value| !value.trim().is_empty()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let basemap_tile_url = lookup("BASEMAP_TILE_URL").unwrap_or_else(|| DEFAULT_TILE_URL.to_string());
        let overview_tile_url = lookup("OVERVIEW_TILE_URL")
            .or_else(|| {
                lookup("THUNDERFOREST_API_KEY").map(|key| {
                    format!("https://{{a-c}}.tile.thunderforest.com/cycle/{{z}}/{{x}}/{{y}}.png?apikey={}", key)
                })
            })
            .unwrap_or_else(|| basemap_tile_url.clone());

        let tile_cache_size = match lookup("TILE_CACHE_SIZE") {
            Some(raw) => raw.trim().parse::<NonZeroUsize>().unwrap_or_else(|e| {
                log::warn!("Ignoring TILE_CACHE_SIZE={:?}: {}", raw, e);
                default_cache_size()
            }),
            None => default_cache_size(),
        };

        Self {
            dataset_url: lookup("DATASET_URL").unwrap_or_else(|| DEFAULT_DATASET_URL.to_string()),
            basemap_tile_url,
            overview_tile_url,
            tile_cache_size,
            export_dir: lookup("EXPORT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            user_agent: lookup("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_the_initial_screen() {
        let config = ViewConfig::default();
        assert!(config.sidebar_open);
        assert!(config.legend_on);
        assert!(!config.zoom_slider_on);
        assert!(!config.overview_map_on);
        assert_eq!(config.scale_unit, ScaleUnit::Metric);
        assert_eq!(config.draw_kind, DrawKind::None);
        assert_eq!(config.density_threshold, None);
    }

    #[test]
    fn apply_returns_a_new_value() {
        let before = ViewConfig::default();
        let after = before.apply(ViewUpdate::ZoomSlider(true)).apply(ViewUpdate::DrawKind(DrawKind::Circle));

        assert_eq!(before, ViewConfig::default());
        assert!(after.zoom_slider_on);
        assert_eq!(after.draw_kind, DrawKind::Circle);
        assert_eq!(after.apply(ViewUpdate::DensityThreshold(42.0)).density_threshold, Some(42.0));
    }

    #[test]
    fn threshold_is_not_persisted() {
        let config = ViewConfig::default()
            .apply(ViewUpdate::DensityThreshold(10.0))
            .apply(ViewUpdate::ScaleUnit(ScaleUnit::Nautical));
        let json = serde_json::to_string(&config).unwrap();
        let restored: ViewConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.scale_unit, ScaleUnit::Nautical);
        assert_eq!(restored.density_threshold, None);
    }

    #[test]
    fn partial_persisted_config_falls_back_to_defaults() {
        let restored: ViewConfig = serde_json::from_str(r#"{"legend_on": false}"#).unwrap();
        assert!(!restored.legend_on);
        assert!(restored.sidebar_open);
    }

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn settings_defaults() {
        let s = settings(&[]);
        assert_eq!(s.dataset_url, DEFAULT_DATASET_URL);
        assert_eq!(s.basemap_tile_url, DEFAULT_TILE_URL);
        assert_eq!(s.overview_tile_url, DEFAULT_TILE_URL);
        assert_eq!(s.tile_cache_size.get(), 512);
        assert_eq!(s.export_dir, PathBuf::from("."));
    }

    #[test]
    fn thunderforest_key_selects_cycle_overview() {
        let s = settings(&[("THUNDERFOREST_API_KEY", "abc"), ("TILE_CACHE_SIZE", "64")]);
        assert_eq!(s.overview_tile_url, "https://{a-c}.tile.thunderforest.com/cycle/{z}/{x}/{y}.png?apikey=abc");
        assert_eq!(s.tile_cache_size.get(), 64);

        let explicit = settings(&[("THUNDERFOREST_API_KEY", "abc"), ("OVERVIEW_TILE_URL", "http://o/{z}/{x}/{y}")]);
        assert_eq!(explicit.overview_tile_url, "http://o/{z}/{x}/{y}");
    }

    #[test]
    fn bad_cache_size_falls_back() {
        assert_eq!(settings(&[("TILE_CACHE_SIZE", "0")]).tile_cache_size.get(), 512);
        assert_eq!(settings(&[("TILE_CACHE_SIZE", "lots")]).tile_cache_size.get(), 512);
    }
}
