use std::collections::BTreeMap;

use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::data::model::TreeTable;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Summary statistics over the matched rows
// ---------------------------------------------------------------------------

/// Species counts over the given rows, most frequent first, capped at `top_n`.
/// Ties keep alphabetical order so the chart is stable across reruns.
pub fn species_counts(table: &TreeTable, indices: &[usize], top_n: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &idx in indices {
        *counts
            .entry(table.records[idx].common_name.as_str())
            .or_default() += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(top_n);
    counts
}

/// Height-range counts keyed by the schema's range index (index n covers
/// roughly 10n..10(n+1) feet) over rows with a known height.
pub fn height_counts(table: &TreeTable, indices: &[usize]) -> Vec<(i32, usize)> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &idx in indices {
        if let Some(height) = table.records[idx].height {
            *counts.entry(height as i32).or_default() += 1;
        }
    }
    counts.into_iter().collect()
}

/// Planting-decade counts (1990, 2000, …) over rows with a known year.
pub fn decade_counts(table: &TreeTable, indices: &[usize]) -> Vec<(i32, usize)> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &idx in indices {
        if let Some(year) = table.records[idx].planting_year {
            *counts.entry(year - year.rem_euclid(10)).or_default() += 1;
        }
    }
    counts.into_iter().collect()
}

/// Mean diameter over rows with a known diameter; `None` if no row has one.
pub fn mean_diameter(table: &TreeTable, indices: &[usize]) -> Option<f64> {
    let known: Vec<f64> = indices
        .iter()
        .filter_map(|&idx| table.records[idx].diameter)
        .collect();
    if known.is_empty() {
        return None;
    }
    Some(known.iter().sum::<f64>() / known.len() as f64)
}

/// (oldest, newest) planting year over rows with a known year.
pub fn year_extent(table: &TreeTable, indices: &[usize]) -> Option<(i32, i32)> {
    let mut extent: Option<(i32, i32)> = None;
    for &idx in indices {
        if let Some(year) = table.records[idx].planting_year {
            extent = Some(match extent {
                Some((lo, hi)) => (lo.min(year), hi.max(year)),
                None => (year, year),
            });
        }
    }
    extent
}

// ---------------------------------------------------------------------------
// Bottom panel – metrics and distribution charts
// ---------------------------------------------------------------------------

/// Render the metrics row and the two distribution bar charts.
pub fn summary_panel(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.table else {
        return;
    };
    let matched = &state.result.matched;
    if matched.is_empty() {
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.strong(format!("Trees shown: {}", matched.len()));
        ui.separator();
        match mean_diameter(table, matched) {
            Some(avg) => ui.strong(format!("Average diameter: {avg:.1} in")),
            None => ui.weak("Average diameter: unknown"),
        };
        ui.separator();
        match year_extent(table, matched) {
            Some((oldest, newest)) => {
                ui.strong(format!("Planted between {oldest} and {newest}"))
            }
            None => ui.weak("Planting years: unknown"),
        };
    });
    ui.separator();

    ui.columns(3, |cols: &mut [Ui]| {
        cols[0].strong("Top tree types");
        species_chart(&mut cols[0], table, matched);
        cols[1].strong("Height ranges");
        height_chart(&mut cols[1], table, matched);
        cols[2].strong("Planting decades");
        decade_chart(&mut cols[2], table, matched);
    });
}

fn species_chart(ui: &mut Ui, table: &TreeTable, matched: &[usize]) {
    let counts = species_counts(table, matched, 10);
    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, (name, n))| Bar::new(i as f64, *n as f64).name(name).width(0.8))
        .collect();

    Plot::new("species_chart")
        .legend(Legend::default())
        .show_axes([false, true])
        .allow_drag(false)
        .allow_scroll(false)
        .height(160.0)
        .show(ui, |plot_ui| {
            for bar in bars {
                let name = bar.name.clone();
                plot_ui.bar_chart(BarChart::new(vec![bar]).name(name));
            }
        });
}

fn height_chart(ui: &mut Ui, table: &TreeTable, matched: &[usize]) {
    let counts = height_counts(table, matched);
    let bars: Vec<Bar> = counts
        .iter()
        .map(|&(range_id, n)| {
            Bar::new(f64::from(range_id), n as f64)
                .name(format!("{}-{} ft", range_id * 10, range_id * 10 + 10))
                .width(0.8)
        })
        .collect();

    Plot::new("height_chart")
        .show_axes([true, true])
        .allow_drag(false)
        .allow_scroll(false)
        .height(160.0)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

fn decade_chart(ui: &mut Ui, table: &TreeTable, matched: &[usize]) {
    let counts = decade_counts(table, matched);
    let bars: Vec<Bar> = counts
        .iter()
        .map(|&(decade, n)| {
            Bar::new(f64::from(decade), n as f64)
                .name(format!("{decade}s"))
                .width(8.0)
        })
        .collect();

    Plot::new("decade_chart")
        .show_axes([true, true])
        .allow_drag(false)
        .allow_scroll(false)
        .height(160.0)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TreeRecord;

    fn tree(name: &str, diameter: Option<f64>, year: Option<i32>) -> TreeRecord {
        TreeRecord {
            neighbourhood: "KITSILANO".to_string(),
            common_name: name.to_string(),
            species_name: "Unknown".to_string(),
            height: None,
            diameter,
            planting_year: year,
            latitude: 49.26,
            longitude: -123.16,
        }
    }

    fn table() -> TreeTable {
        TreeTable::from_records(vec![
            tree("MAPLE", Some(10.0), Some(1998)),
            tree("MAPLE", Some(20.0), Some(2004)),
            tree("CHERRY", None, Some(2001)),
            tree("OAK", Some(6.0), None),
        ])
    }

    #[test]
    fn species_counts_sorts_by_frequency_then_name() {
        let t = table();
        let all: Vec<usize> = (0..t.len()).collect();
        assert_eq!(
            species_counts(&t, &all, 10),
            vec![
                ("MAPLE".to_string(), 2),
                ("CHERRY".to_string(), 1),
                ("OAK".to_string(), 1),
            ]
        );
        assert_eq!(species_counts(&t, &all, 1).len(), 1);
    }

    #[test]
    fn height_counts_group_by_range_index() {
        let mut short = tree("MAPLE", None, None);
        short.height = Some(1.0);
        let mut tall = tree("OAK", None, None);
        tall.height = Some(4.0);
        let unmeasured = tree("CHERRY", None, None);

        let t = TreeTable::from_records(vec![short.clone(), short, tall, unmeasured]);
        let all: Vec<usize> = (0..t.len()).collect();
        assert_eq!(height_counts(&t, &all), vec![(1, 2), (4, 1)]);
    }

    #[test]
    fn decade_counts_skip_unknown_years() {
        let t = table();
        let all: Vec<usize> = (0..t.len()).collect();
        assert_eq!(decade_counts(&t, &all), vec![(1990, 1), (2000, 2)]);
    }

    #[test]
    fn mean_diameter_ignores_absent_values() {
        let t = table();
        let all: Vec<usize> = (0..t.len()).collect();
        assert_eq!(mean_diameter(&t, &all), Some(12.0));
        assert_eq!(mean_diameter(&t, &[2]), None);
    }

    #[test]
    fn year_extent_over_known_years() {
        let t = table();
        let all: Vec<usize> = (0..t.len()).collect();
        assert_eq!(year_extent(&t, &all), Some((1998, 2004)));
        assert_eq!(year_extent(&t, &[3]), None);
    }

    #[test]
    fn stats_over_an_empty_view() {
        let t = table();
        assert!(species_counts(&t, &[], 10).is_empty());
        assert_eq!(mean_diameter(&t, &[]), None);
        assert_eq!(year_extent(&t, &[]), None);
    }
}
