use anyhow::Context as _;
use eframe::egui;
use egui::{Margin, Style};
use lru::LruCache;
use tokio::sync::mpsc;

use super::control_panel::{self, PanelAction};
use super::overlays;
use super::viewer::{Viewer, INITIAL_CENTER, INITIAL_ZOOM};
use crate::config::{Settings, ViewConfig};
use crate::map::map::{toggle_fullscreen, Map, MapState, TileSet};
use crate::map::map_tile::{MapTile, TileKey};
use crate::map::view::View;
use crate::maps_api::dataset::fetch_dataset;
use crate::maps_api::tile_retriever::{http_client, TileRetriever};
use crate::maps_api::{Fetched, TileLayer, TileRequests};

pub struct ViewerApp {
    viewer: Viewer,
    map: MapState,
    basemap_tiles: LruCache<TileKey, MapTile>,
    overview_tiles: LruCache<TileKey, MapTile>,
    basemap: TileRetriever,
    overview: TileRetriever,
    tile_requests: TileRequests,
    dataset_pending: bool,
    receiver: mpsc::UnboundedReceiver<Fetched>,
    sender: mpsc::UnboundedSender<Fetched>,
    runtime: tokio::runtime::Runtime,
}

impl eframe::App for ViewerApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self.viewer.config());
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::F11)) {
            toggle_fullscreen(ctx);
        }

        let status = self.viewer.status();
        let config = self.viewer.config().clone();
        let actions = control_panel::show(ctx, &config, self.viewer.search_text_mut(), status.as_deref());
        for action in actions {
            match action {
                PanelAction::Update(update) => self.viewer.update(update, &mut self.map),
                PanelAction::Search => self.viewer.search(&mut self.map),
                PanelAction::FlyToNewYork => self.viewer.fly_to_new_york(&mut self.map),
                PanelAction::Export => self.viewer.export(&mut self.map),
            }
        }

        let config = self.viewer.config().clone();
        let mut missing_basemap = Vec::new();
        let mut missing_overview = Vec::new();
        let loading = self.dataset_pending || self.tile_requests.is_loading();

        let map_rect = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let map = Map::new(
                    &mut self.map,
                    TileSet { cache: &mut self.basemap_tiles, missing: &mut missing_basemap },
                    &config,
                )
                .overview(TileSet { cache: &mut self.overview_tiles, missing: &mut missing_overview })
                .loading(loading);
                ui.add(map).rect
            })
            .inner;

        if config.legend_on {
            overlays::legend(ctx, map_rect);
        }
        if let Some(popover) = self.viewer.popover() {
            overlays::popover(ctx, &popover);
        }

        self.request_tiles(ctx, TileLayer::Basemap, missing_basemap);
        self.request_tiles(ctx, TileLayer::Overview, missing_overview);

        // Process completed requests
        while let Ok(fetched) = self.receiver.try_recv() {
            match fetched {
                Fetched::Tile { layer, key, result } => match result {
                    Ok(tile) => {
                        self.tile_requests.succeeded(layer, key);
                        self.cache_mut(layer).put(key, tile);
                    }
                    Err(e) => {
                        log::warn!("Error fetching {:?} tile {:?}: {:#}", layer, key, e);
                        self.tile_requests.failed(layer, key);
                    }
                },
                Fetched::Dataset(result) => {
                    self.dataset_pending = false;
                    self.viewer.on_dataset_loaded(result, &mut self.map);
                }
            }
        }
    }
}

impl ViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> anyhow::Result<Self> {
        cc.egui_ctx.set_style(Self::get_dark_theme_style(&cc.egui_ctx));

        let config: ViewConfig = cc.storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .thread_name("map-fetcher")
            .enable_all()
            .build()
            .context("unable to create runtime")?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let client = http_client(&settings.user_agent)?;

        let viewer = Viewer::new(config, settings.export_dir.clone());
        let mut map = MapState::new(View::new(INITIAL_CENTER, INITIAL_ZOOM));
        viewer.install(&mut map);

        let dataset_sender = sender.clone();
        let dataset_client = client.clone();
        let requester = cc.egui_ctx.clone();
        let url = settings.dataset_url.clone();
        runtime.spawn(async move {
            let result = fetch_dataset(&dataset_client, &url).await;
            if dataset_sender.send(Fetched::Dataset(result)).is_err() {
                log::warn!("Viewer closed before the dataset arrived");
            }
            requester.request_repaint();
        });

        Ok(Self {
            viewer,
            map,
            basemap_tiles: LruCache::new(settings.tile_cache_size),
            overview_tiles: LruCache::new(settings.tile_cache_size),
            basemap: TileRetriever::new(client.clone(), settings.basemap_tile_url),
            overview: TileRetriever::new(client, settings.overview_tile_url),
            tile_requests: TileRequests::default(),
            dataset_pending: true,
            receiver,
            sender,
            runtime,
        })
    }

    fn cache_mut(&mut self, layer: TileLayer) -> &mut LruCache<TileKey, MapTile> {
        match layer {
            TileLayer::Basemap => &mut self.basemap_tiles,
            TileLayer::Overview => &mut self.overview_tiles,
        }
    }

    fn request_tiles(&mut self, ctx: &egui::Context, layer: TileLayer, missing: Vec<TileKey>) {
        for key in missing {
            // Check if we need to fetch the tile, or are waiting for it
            if !self.tile_requests.should_fetch(layer, key) || self.cache_mut(layer).contains(&key) {
                continue;
            }
            let retriever = match layer {
                TileLayer::Basemap => self.basemap.clone(),
                TileLayer::Overview => self.overview.clone(),
            };
            let sender = self.sender.clone();
            let requester = ctx.clone(); // Uses ARC so can be cloned to a new thread cheaply

            self.runtime.spawn(async move {
                let result = retriever.fetch_tile(key).await;
                if sender.send(Fetched::Tile { layer, key, result }).is_err() {
                    log::debug!("Dropped tile {:?}, viewer closed", key);
                }
                requester.request_repaint();
            });
            self.tile_requests.started(layer, key);
        }
    }

    pub fn get_dark_theme_style(ctx: &egui::Context) -> Style {
        use egui::{
            style::{Selection, Visuals, WidgetVisuals, Widgets},
            Color32, FontFamily, FontId, Rounding, Stroke, TextStyle,
        };

        let mut style = (*ctx.style()).clone();

        style.text_styles = [
            (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
            (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
            (TextStyle::Monospace, FontId::new(14.0, FontFamily::Monospace)),
            (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
            (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
        ]
        .into();

        let panel_bg = Color32::from_rgb(32, 33, 36);
        let widget = |bg_fill: Color32, border: Color32, text: Color32, expansion: f32| WidgetVisuals {
            bg_fill,
            weak_bg_fill: bg_fill,
            bg_stroke: Stroke::new(1.0, border),
            fg_stroke: Stroke::new(1.0, text),
            rounding: Rounding::same(4.0),
            expansion,
        };

        style.visuals = Visuals::dark();
        style.visuals.override_text_color = Some(Color32::LIGHT_GRAY);
        style.visuals.widgets = Widgets {
            noninteractive: widget(panel_bg, Color32::from_gray(60), Color32::LIGHT_GRAY, 0.0),
            inactive: widget(Color32::from_gray(48), Color32::from_gray(75), Color32::LIGHT_GRAY, 0.0),
            hovered: widget(Color32::from_gray(58), Color32::WHITE, Color32::WHITE, 0.5),
            active: widget(Color32::from_gray(68), Color32::WHITE, Color32::WHITE, 1.0),
            open: widget(Color32::from_gray(40), Color32::WHITE, Color32::WHITE, 0.0),
        };
        style.visuals.selection = Selection {
            bg_fill: Color32::from_rgb(0x2e, 0xca, 0x6f).gamma_multiply(0.5),
            stroke: Stroke::new(1.0, Color32::WHITE),
        };

        style.visuals.window_rounding = Rounding::same(6.0);
        style.visuals.window_shadow = egui::Shadow {
            offset: egui::vec2(0.0, 1.0),
            blur: 3.0,
            spread: 0.0,
            color: Color32::from_black_alpha(128),
        };
        style.visuals.window_fill = panel_bg;
        style.visuals.window_stroke = Stroke::new(1.0, Color32::from_gray(60));
        style.visuals.panel_fill = panel_bg;

        style.spacing.window_margin = Margin::same(6.0);
        style.spacing.button_padding = egui::vec2(6.0, 3.0);

        style
    }
}
