pub mod control_panel;
pub mod overlays;
pub mod viewer;
pub mod viewer_app;
