use eframe::egui::{self, Color32, ComboBox, RichText, ScrollArea, Slider, Ui};

use crate::data::filter::RangeFilter;
use crate::data::loader::{DEFAULT_API_ENDPOINT, DataSource};
use crate::data::model::NEIGHBOURHOODS;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Top bar – data source selection and status
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open CSV…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        // API fetch: pick a neighbourhood first so the download stays small.
        let mut api_hood = match &state.source {
            Some(DataSource::Api {
                neighbourhood: Some(h),
                ..
            }) => h.clone(),
            _ => state.filters.neighbourhood.clone().unwrap_or_default(),
        };
        ComboBox::from_id_salt("api_neighbourhood")
            .selected_text(if api_hood.is_empty() {
                "Neighbourhood…"
            } else {
                api_hood.as_str()
            })
            .show_ui(ui, |ui: &mut Ui| {
                for hood in NEIGHBOURHOODS {
                    ui.selectable_value(&mut api_hood, (*hood).to_string(), *hood);
                }
            });
        if ui.button("Fetch from API").clicked() && !api_hood.is_empty() {
            state.load_source(DataSource::Api {
                endpoint: DEFAULT_API_ENDPOINT.to_string(),
                neighbourhood: Some(api_hood),
            });
        }
        if state.source.is_some() && ui.button("Reload").clicked() {
            state.reload();
        }

        ui.separator();

        if let Some(table) = &state.table {
            let mut text = format!(
                "{} trees loaded, {} shown",
                table.len(),
                state.result.matched.len()
            );
            if state.dropped_rows > 0 {
                text.push_str(&format!(", {} malformed rows dropped", state.dropped_rows));
            }
            ui.label(text);
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate the filters inside the closures.
    let hoods = table.neighbourhoods.clone();
    let names = table.common_names.clone();
    let height_bounds = table.height_bounds;
    let diameter_bounds = table.diameter_bounds;
    let year_bounds = table.year_bounds;

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if ui.button("Clear All Filters").clicked() {
                state.clear_filters();
            }
            ui.separator();

            changed |= exact_match_combo(
                ui,
                "Neighbourhood",
                "All",
                &hoods,
                &mut state.filters.neighbourhood,
            );
            changed |= exact_match_combo(
                ui,
                "Tree type",
                "All",
                &names,
                &mut state.filters.common_name,
            );
            ui.separator();

            changed |= range_section(
                ui,
                "Height range",
                &mut state.filters.height,
                height_bounds,
            );
            changed |= range_section(
                ui,
                "Diameter (in)",
                &mut state.filters.diameter,
                diameter_bounds,
            );
            changed |= range_section(
                ui,
                "Planting year",
                &mut state.filters.year,
                year_bounds.map(|(lo, hi)| (f64::from(lo), f64::from(hi))),
            );
            ui.separator();

            changed |= exact_match_combo(
                ui,
                "Highlight species",
                "None",
                &names,
                &mut state.filters.highlight,
            );
            spotlight_info(ui, state);
        });

    if changed {
        state.refilter();
    }
}

/// ComboBox for an optional exact-match predicate. Returns true on change.
fn exact_match_combo(
    ui: &mut Ui,
    label: &str,
    none_label: &str,
    options: &[String],
    selection: &mut Option<String>,
) -> bool {
    let mut changed = false;
    ui.strong(label);
    ComboBox::from_id_salt(label)
        .selected_text(selection.as_deref().unwrap_or(none_label))
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(selection.is_none(), none_label)
                .clicked()
            {
                *selection = None;
                changed = true;
            }
            for opt in options {
                if ui
                    .selectable_label(selection.as_deref() == Some(opt.as_str()), opt)
                    .clicked()
                {
                    *selection = Some(opt.clone());
                    changed = true;
                }
            }
        });
    changed
}

/// Toggle + min/max sliders for one numeric range. Returns true on change.
///
/// The sliders span the table's observed bounds; disabling the toggle makes
/// the range inactive again (rows with absent values reappear).
fn range_section(
    ui: &mut Ui,
    label: &str,
    range: &mut RangeFilter,
    bounds: Option<(f64, f64)>,
) -> bool {
    let Some((lo, hi)) = bounds else {
        ui.weak(format!("{label}: no measurements in this dataset"));
        return false;
    };

    let mut changed = false;
    let mut active = range.is_active();
    if ui.checkbox(&mut active, label).changed() {
        *range = if active {
            RangeFilter::between(lo, hi)
        } else {
            RangeFilter::default()
        };
        changed = true;
    }

    if range.is_active() {
        let mut min = range.min.unwrap_or(lo);
        let mut max = range.max.unwrap_or(hi);
        if ui.add(Slider::new(&mut min, lo..=hi).text("min")).changed() {
            range.min = Some(min);
            range.max = Some(max.max(min));
            changed = true;
        }
        if ui.add(Slider::new(&mut max, lo..=hi).text("max")).changed() {
            range.max = Some(max);
            range.min = Some(min.min(max));
            changed = true;
        }
    }
    changed
}

/// Latin name and a reference link for the highlighted species.
fn spotlight_info(ui: &mut Ui, state: &AppState) {
    let Some(name) = &state.filters.highlight else {
        return;
    };
    let Some(rec) = state
        .table
        .as_ref()
        .and_then(|t| t.find_by_common_name(name))
    else {
        return;
    };

    ui.label(RichText::new(&rec.species_name).italics());
    if rec.species_name != "Unknown" {
        let wiki = format!(
            "https://en.wikipedia.org/wiki/{}",
            rec.species_name.replace(' ', "_")
        );
        ui.hyperlink_to("Learn more on Wikipedia", wiki);
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open tree dataset")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.load_source(DataSource::File(path));
    }
}
