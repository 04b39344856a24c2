use std::collections::BTreeMap;

use eframe::egui::Ui;
use egui_plot::{Legend, Plot, PlotPoints, Points};

use crate::color::HIGHLIGHT_COLOR;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Tree map (central panel)
// ---------------------------------------------------------------------------

/// Render the matched trees as a point map (longitude on x, latitude on y).
/// Highlighted-species markers are drawn on top in the accent colour.
pub fn tree_map(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.table else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a CSV or fetch from the API to view trees");
        });
        return;
    };

    if state.result.matched.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No trees match the selected filters.");
        });
        return;
    }

    // Group matched rows by species so each gets one legend entry.
    let mut by_species: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    let mut mean_lat = 0.0;
    for &idx in &state.result.matched {
        let rec = &table.records[idx];
        by_species
            .entry(rec.common_name.as_str())
            .or_default()
            .push([rec.longitude, rec.latitude]);
        mean_lat += rec.latitude;
    }
    mean_lat /= state.result.matched.len() as f64;

    let highlight: Vec<[f64; 2]> = state
        .result
        .highlighted
        .iter()
        .map(|&idx| {
            let rec = &table.records[idx];
            [rec.longitude, rec.latitude]
        })
        .collect();

    Plot::new("tree_map")
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        // One degree of longitude shrinks with latitude.
        .data_aspect(1.0 / mean_lat.to_radians().cos() as f32)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (name, coords) in by_species {
                let color = state
                    .color_map
                    .as_ref()
                    .map(|cm| cm.color_for(name))
                    .unwrap_or(eframe::egui::Color32::DARK_GREEN);
                let points: PlotPoints = coords.into();
                plot_ui.points(Points::new(points).name(name).color(color).radius(2.5));
            }

            if !highlight.is_empty() {
                let name = state.filters.highlight.as_deref().unwrap_or("highlight");
                let points: PlotPoints = highlight.into();
                plot_ui.points(
                    Points::new(points)
                        .name(format!("★ {name}"))
                        .color(HIGHLIGHT_COLOR)
                        .radius(4.5),
                );
            }
        });
}
