#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod data;
mod map;
mod maps_api;
mod ui;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let settings = config::Settings::from_env();
    log::info!("Dataset {}, basemap {}", settings.dataset_url, settings.basemap_tile_url);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1280.0, 800.0))
            .with_min_inner_size(egui::vec2(400.0, 300.0))
            .with_title("US Population Density")
            .with_resizable(true)
            .with_decorations(true),
        ..Default::default()
    };

    eframe::run_native(
        "densitymap",
        native_options,
        Box::new(|cc| Ok(Box::new(ui::viewer_app::ViewerApp::new(cc, settings)?))),
    )
}
