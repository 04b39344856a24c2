use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// TreeRecord – one row of the dataset
// ---------------------------------------------------------------------------

/// A single tree (one row of the source table), normalized at load time:
/// strings trimmed, neighbourhood uppercased, absent numerics kept as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRecord {
    /// District name, uppercase, non-empty.
    pub neighbourhood: String,
    /// Species common name (e.g. "KWANZAN FLOWERING CHERRY").
    pub common_name: String,
    /// Latin species name, "Unknown" when the source omits it.
    pub species_name: String,
    /// Height-range index from the open-data schema; `None` when unmeasured.
    pub height: Option<f64>,
    /// Trunk diameter in inches; `None` when unmeasured.
    pub diameter: Option<f64>,
    /// Calendar year the tree was planted; `None` when unrecorded.
    pub planting_year: Option<i32>,
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// TreeTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed table with pre-computed unique values and numeric bounds.
/// Immutable for the session; filtering only derives index views from it.
#[derive(Debug, Clone, Default)]
pub struct TreeTable {
    /// All trees (rows), in source order.
    pub records: Vec<TreeRecord>,
    /// Sorted unique common names (for selector widgets).
    pub common_names: Vec<String>,
    /// Sorted unique neighbourhood names present in the data.
    pub neighbourhoods: Vec<String>,
    /// (min, max) over rows where the field is present; `None` if never present.
    pub height_bounds: Option<(f64, f64)>,
    pub diameter_bounds: Option<(f64, f64)>,
    pub year_bounds: Option<(i32, i32)>,
}

impl TreeTable {
    /// Build unique-value indices and numeric bounds from the loaded rows.
    pub fn from_records(records: Vec<TreeRecord>) -> Self {
        let mut names: BTreeSet<String> = BTreeSet::new();
        let mut hoods: BTreeSet<String> = BTreeSet::new();
        let mut height_bounds: Option<(f64, f64)> = None;
        let mut diameter_bounds: Option<(f64, f64)> = None;
        let mut year_bounds: Option<(i32, i32)> = None;

        for rec in &records {
            names.insert(rec.common_name.clone());
            hoods.insert(rec.neighbourhood.clone());
            if let Some(h) = rec.height {
                height_bounds = Some(extend_f64(height_bounds, h));
            }
            if let Some(d) = rec.diameter {
                diameter_bounds = Some(extend_f64(diameter_bounds, d));
            }
            if let Some(y) = rec.planting_year {
                year_bounds = Some(extend_i32(year_bounds, y));
            }
        }

        TreeTable {
            records,
            common_names: names.into_iter().collect(),
            neighbourhoods: hoods.into_iter().collect(),
            height_bounds,
            diameter_bounds,
            year_bounds,
        }
    }

    /// Number of trees.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First row matching the given common name, if any.
    pub fn find_by_common_name(&self, name: &str) -> Option<&TreeRecord> {
        self.records.iter().find(|r| r.common_name == name)
    }
}

fn extend_f64(bounds: Option<(f64, f64)>, v: f64) -> (f64, f64) {
    match bounds {
        Some((lo, hi)) => (lo.min(v), hi.max(v)),
        None => (v, v),
    }
}

fn extend_i32(bounds: Option<(i32, i32)>, v: i32) -> (i32, i32) {
    match bounds {
        Some((lo, hi)) => (lo.min(v), hi.max(v)),
        None => (v, v),
    }
}

// ---------------------------------------------------------------------------
// Known districts
// ---------------------------------------------------------------------------

/// The city's 22 local areas, as published in the open-data schema.
/// Used for the neighbourhood selector before any data is loaded and for the
/// API where-clause.
pub const NEIGHBOURHOODS: &[&str] = &[
    "ARBUTUS RIDGE",
    "DOWNTOWN",
    "DUNBAR-SOUTHLANDS",
    "FAIRVIEW",
    "GRANDVIEW-WOODLAND",
    "HASTINGS-SUNRISE",
    "KENSINGTON-CEDAR COTTAGE",
    "KERRISDALE",
    "KILLARNEY",
    "KITSILANO",
    "MARPOLE",
    "MOUNT PLEASANT",
    "OAKRIDGE",
    "RENFREW-COLLINGWOOD",
    "RILEY PARK",
    "SHAUGHNESSY",
    "SOUTH CAMBIE",
    "STRATHCONA",
    "SUNSET",
    "VICTORIA-FRASERVIEW",
    "WEST END",
    "WEST POINT GREY",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, hood: &str, diameter: Option<f64>, year: Option<i32>) -> TreeRecord {
        TreeRecord {
            neighbourhood: hood.to_string(),
            common_name: name.to_string(),
            species_name: "Unknown".to_string(),
            height: None,
            diameter,
            planting_year: year,
            latitude: 49.26,
            longitude: -123.15,
        }
    }

    #[test]
    fn from_records_collects_sorted_unique_names() {
        let table = TreeTable::from_records(vec![
            rec("MAPLE", "KITSILANO", None, None),
            rec("CHERRY", "KITSILANO", None, None),
            rec("MAPLE", "DUNBAR-SOUTHLANDS", None, None),
        ]);
        assert_eq!(table.common_names, vec!["CHERRY", "MAPLE"]);
        assert_eq!(table.neighbourhoods, vec!["DUNBAR-SOUTHLANDS", "KITSILANO"]);
    }

    #[test]
    fn bounds_ignore_absent_values() {
        let table = TreeTable::from_records(vec![
            rec("MAPLE", "KITSILANO", Some(12.0), Some(1999)),
            rec("CHERRY", "KITSILANO", None, Some(2010)),
            rec("OAK", "KITSILANO", Some(3.5), None),
        ]);
        assert_eq!(table.diameter_bounds, Some((3.5, 12.0)));
        assert_eq!(table.year_bounds, Some((1999, 2010)));
        assert_eq!(table.height_bounds, None);
    }

    #[test]
    fn empty_table_has_no_bounds() {
        let table = TreeTable::from_records(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.diameter_bounds, None);
    }
}
