use crate::color::ColorMap;
use crate::data::filter::{FilterResult, FilterSpec, apply_filters};
use crate::data::loader::{DataSource, LoadReport, load_table};
use crate::data::model::TreeTable;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering: the chosen source, the
/// loaded table, the active filters, and the cached result view. Created on
/// app start, dropped on exit.
pub struct AppState {
    /// Currently selected data source (None until the user picks one).
    pub source: Option<DataSource>,

    /// Loaded table (None until a load succeeds). Immutable once set.
    pub table: Option<TreeTable>,

    /// Malformed rows dropped by the last successful load.
    pub dropped_rows: usize,

    /// Current user-selected constraints.
    pub filters: FilterSpec,

    /// Indices of rows passing the filters / carrying the highlight (cached).
    pub result: FilterResult,

    /// Species → marker colour for the current table.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a load operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            source: None,
            table: None,
            dropped_rows: 0,
            filters: FilterSpec::default(),
            result: FilterResult::default(),
            color_map: None,
            status_message: None,
            loading: false,
        }
    }
}

impl AppState {
    /// Run the loader for `source` and install the result.
    ///
    /// On failure the previous table (if any) stays in place so the user can
    /// keep filtering it; only the status message changes.
    pub fn load_source(&mut self, source: DataSource) {
        self.loading = true;
        match load_table(&source) {
            Ok(report) => {
                log::info!(
                    "loaded {} trees ({} rows dropped)",
                    report.table.len(),
                    report.dropped_rows
                );
                self.set_table(&source, report);
            }
            Err(e) => {
                log::error!("load failed: {e:#}");
                self.status_message = Some(format!("Load failed: {e}"));
                self.loading = false;
            }
        }
        self.source = Some(source);
    }

    /// Re-run the loader for the current source (safe to call repeatedly).
    pub fn reload(&mut self) {
        if let Some(source) = self.source.clone() {
            self.load_source(source);
        }
    }

    /// Ingest a newly loaded table, reset filters, rebuild the colour map.
    pub fn set_table(&mut self, source: &DataSource, report: LoadReport) {
        self.filters = FilterSpec::default();
        // An API load narrowed to one neighbourhood keeps that selection.
        if let DataSource::Api {
            neighbourhood: Some(hood),
            ..
        } = source
        {
            self.filters.neighbourhood = Some(hood.clone());
        }

        self.color_map = Some(ColorMap::new(&report.table.common_names));
        self.table = Some(report.table);
        self.dropped_rows = report.dropped_rows;
        self.status_message = None;
        self.loading = false;
        self.refilter();
    }

    /// Recompute the cached result view after a filter change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.result = apply_filters(table, &self.filters);
        } else {
            self.result = FilterResult::default();
        }
    }

    /// Drop all filters except the neighbourhood selection.
    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.refilter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;
    use std::path::PathBuf;

    fn loaded_state() -> AppState {
        let csv = "NEIGHBOURHOOD_NAME;COMMON_NAME;GEO_POINT_2D\n\
                   KITSILANO;MAPLE;49.26, -123.16\n\
                   SUNSET;CHERRY;49.22, -123.09";
        let report = parse_csv(csv.as_bytes()).expect("parse should succeed");
        let mut state = AppState::default();
        state.set_table(&DataSource::File(PathBuf::from("trees.csv")), report);
        state
    }

    #[test]
    fn set_table_initialises_the_result_view() {
        let state = loaded_state();
        assert_eq!(state.result.matched, vec![0, 1]);
        assert!(state.color_map.is_some());
        assert!(state.status_message.is_none());
    }

    #[test]
    fn failed_load_keeps_the_previous_table() {
        let mut state = loaded_state();
        state.load_source(DataSource::File(PathBuf::from("/no/such/file.csv")));

        assert!(state.status_message.is_some());
        assert_eq!(state.table.as_ref().map(TreeTable::len), Some(2));
        // Previous result view is still usable for filtering.
        assert_eq!(state.result.matched, vec![0, 1]);
    }

    #[test]
    fn api_source_preselects_its_neighbourhood() {
        let csv = "NEIGHBOURHOOD_NAME;COMMON_NAME;GEO_POINT_2D\n\
                   KITSILANO;MAPLE;49.26, -123.16\n\
                   SUNSET;CHERRY;49.22, -123.09";
        let report = parse_csv(csv.as_bytes()).expect("parse should succeed");
        let mut state = AppState::default();
        state.set_table(
            &DataSource::Api {
                endpoint: "http://example.invalid".to_string(),
                neighbourhood: Some("KITSILANO".to_string()),
            },
            report,
        );
        assert_eq!(state.filters.neighbourhood.as_deref(), Some("KITSILANO"));
        assert_eq!(state.result.matched, vec![0]);
    }

    #[test]
    fn clear_filters_keeps_the_neighbourhood() {
        let mut state = loaded_state();
        state.filters.neighbourhood = Some("SUNSET".to_string());
        state.filters.common_name = Some("MAPLE".to_string());
        state.refilter();
        assert!(state.result.matched.is_empty());

        state.clear_filters();
        assert_eq!(state.filters.neighbourhood.as_deref(), Some("SUNSET"));
        assert_eq!(state.result.matched, vec![1]);
    }
}
