use egui::{Align2, RichText};

use crate::config::{DrawKind, ScaleUnit, ViewConfig, ViewUpdate};

/// Something the user asked for in the sidebar this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAction {
    Update(ViewUpdate),
    Search,
    FlyToNewYork,
    Export,
}

/// Sidebar with the search box, control toggles and drawing tools. Slides in
/// and out with `config.sidebar_open`.
pub fn show(ctx: &egui::Context, config: &ViewConfig, search_text: &mut String, status: Option<&str>) -> Vec<PanelAction> {
    let mut actions = Vec::new();

    if !config.sidebar_open {
        egui::Area::new(egui::Id::new("sidebar_open"))
            .anchor(Align2::LEFT_TOP, egui::vec2(44.0, 8.0))
            .show(ctx, |ui| {
                if ui.button("\u{bb}").on_hover_text("Show controls").clicked() {
                    actions.push(PanelAction::Update(ViewUpdate::SidebarOpen(true)));
                }
            });
    }

    egui::SidePanel::left("controls")
        .resizable(false)
        .default_width(260.0)
        .show_animated(ctx, config.sidebar_open, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Population density");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("\u{ab}").on_hover_text("Hide controls").clicked() {
                        actions.push(PanelAction::Update(ViewUpdate::SidebarOpen(false)));
                    }
                });
            });
            ui.separator();

            search_box(ui, config, search_text, &mut actions);
            ui.separator();

            toggles(ui, config, &mut actions);
            ui.separator();

            ui.label(RichText::new("Draw").strong());
            for kind in DrawKind::ALL {
                if ui.radio(config.draw_kind == kind, kind.label()).clicked() {
                    actions.push(PanelAction::Update(ViewUpdate::DrawKind(kind)));
                }
            }
            ui.separator();

            if ui.button("Fly to New York").clicked() {
                actions.push(PanelAction::FlyToNewYork);
            }
            if ui.button("Export PNG").clicked() {
                actions.push(PanelAction::Export);
            }

            if let Some(status) = status {
                ui.separator();
                ui.label(RichText::new(status).small());
            }
        });

    actions
}

fn search_box(ui: &mut egui::Ui, config: &ViewConfig, search_text: &mut String, actions: &mut Vec<PanelAction>) {
    ui.label("Show states with density above");
    ui.horizontal(|ui| {
        let edit = ui.add(egui::TextEdit::singleline(search_text).hint_text("e.g. 100").desired_width(140.0));
        let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Search").clicked() || submitted {
            actions.push(PanelAction::Search);
        }
    });
    if let Some(threshold) = config.density_threshold {
        ui.label(RichText::new(format!("Filter: density > {}", threshold)).small());
    }
}

fn toggles(ui: &mut egui::Ui, config: &ViewConfig, actions: &mut Vec<PanelAction>) {
    let mut zoom_slider = config.zoom_slider_on;
    if ui.checkbox(&mut zoom_slider, "Zoom slider").changed() {
        actions.push(PanelAction::Update(ViewUpdate::ZoomSlider(zoom_slider)));
    }
    let mut overview = config.overview_map_on;
    if ui.checkbox(&mut overview, "Overview map").changed() {
        actions.push(PanelAction::Update(ViewUpdate::OverviewMap(overview)));
    }
    let mut legend = config.legend_on;
    if ui.checkbox(&mut legend, "Legend").changed() {
        actions.push(PanelAction::Update(ViewUpdate::Legend(legend)));
    }

    egui::ComboBox::from_id_salt("scale_unit")
        .selected_text(config.scale_unit.label())
        .show_ui(ui, |ui| {
            for unit in ScaleUnit::ALL {
                if ui.selectable_label(config.scale_unit == unit, unit.label()).clicked() {
                    actions.push(PanelAction::Update(ViewUpdate::ScaleUnit(unit)));
                }
            }
        });
}
