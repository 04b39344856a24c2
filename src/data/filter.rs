use super::model::{TreeRecord, TreeTable};

// ---------------------------------------------------------------------------
// FilterSpec – the user-selected constraints
// ---------------------------------------------------------------------------

/// An inclusive numeric range; either end may be unbounded.
/// An inactive range (both ends `None`) matches everything, including rows
/// where the field is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn at_least(min: f64) -> Self {
        RangeFilter {
            min: Some(min),
            max: None,
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        RangeFilter {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Whether this range constrains anything at all.
    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// A row with an absent value fails any active range on that field:
    /// a tree with unknown height never matches a height filter.
    pub fn matches(&self, value: Option<f64>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(v) = value else {
            return false;
        };
        self.min.is_none_or(|lo| v >= lo) && self.max.is_none_or(|hi| v <= hi)
    }
}

/// All constraints are independent and optional; `None` / inactive means
/// "no filter" on that dimension. `highlight` marks a species for emphasis,
/// it never excludes rows from the main result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub neighbourhood: Option<String>,
    pub common_name: Option<String>,
    pub height: RangeFilter,
    pub diameter: RangeFilter,
    pub year: RangeFilter,
    pub highlight: Option<String>,
}

impl FilterSpec {
    /// Drop every constraint (the "Clear All Filters" button).
    pub fn clear(&mut self) {
        *self = FilterSpec {
            neighbourhood: self.neighbourhood.take(),
            ..FilterSpec::default()
        };
    }
}

// ---------------------------------------------------------------------------
// Applying the filters
// ---------------------------------------------------------------------------

/// Index views into the table. Row order from the source is preserved;
/// the two lists may overlap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterResult {
    /// Rows passing every active predicate.
    pub matched: Vec<usize>,
    /// Rows of the highlighted species (neighbourhood-scoped only).
    pub highlighted: Vec<usize>,
}

/// Apply a [`FilterSpec`] to the table.
///
/// A row is in `matched` iff it passes all active predicates (logical AND).
/// `highlighted` is computed independently: it ignores the common-name and
/// numeric range filters so that emphasis is never thinned by exclusion,
/// but stays within the selected neighbourhood.
///
/// Never fails; an empty `matched` list is a valid outcome.
pub fn apply_filters(table: &TreeTable, spec: &FilterSpec) -> FilterResult {
    let matched = table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| row_matches(rec, spec))
        .map(|(i, _)| i)
        .collect();

    let highlighted = match &spec.highlight {
        Some(name) => table
            .records
            .iter()
            .enumerate()
            .filter(|(_, rec)| {
                rec.common_name == *name && in_neighbourhood(rec, spec.neighbourhood.as_deref())
            })
            .map(|(i, _)| i)
            .collect(),
        None => Vec::new(),
    };

    FilterResult {
        matched,
        highlighted,
    }
}

fn row_matches(rec: &TreeRecord, spec: &FilterSpec) -> bool {
    in_neighbourhood(rec, spec.neighbourhood.as_deref())
        && spec
            .common_name
            .as_deref()
            .is_none_or(|n| rec.common_name == n)
        && spec.height.matches(rec.height)
        && spec.diameter.matches(rec.diameter)
        && spec.year.matches(rec.planting_year.map(f64::from))
}

fn in_neighbourhood(rec: &TreeRecord, hood: Option<&str>) -> bool {
    hood.is_none_or(|h| rec.neighbourhood == h)
}
