use eframe::egui;

use crate::state::AppState;
use crate::ui::{charts, map, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CanopyApp {
    pub state: AppState,
}

impl eframe::App for CanopyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: data source and status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: summary statistics and charts ----
        egui::TopBottomPanel::bottom("summary_panel")
            .resizable(true)
            .show(ctx, |ui| {
                charts::summary_panel(ui, &self.state);
            });

        // ---- Central panel: map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map::tree_map(ui, &self.state);
        });
    }
}
