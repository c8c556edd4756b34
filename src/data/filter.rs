use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

use super::model::{CellValue, DataTable, TableView};
use super::period::{calendar_date, order_key, PeriodDomain, PeriodKey};

/// Column holding the period label in every published table.
pub const PERIOD_COLUMN: &str = "Periodo";

// ---------------------------------------------------------------------------
// Dimensions and column resolution
// ---------------------------------------------------------------------------

/// Categorical dimensions, in the fixed order their filters are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Location,
    Subgroup,
    EcoicopGroup,
    DataType,
    Heading,
    SpecialGroup,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Location,
        Dimension::Subgroup,
        Dimension::EcoicopGroup,
        Dimension::DataType,
        Dimension::Heading,
        Dimension::SpecialGroup,
    ];

    /// Selector title. Location uses the resolved column name instead.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Location => "Localización",
            Dimension::Subgroup => "Subgrupos",
            Dimension::EcoicopGroup => "Grupos ECOICOP",
            Dimension::DataType => "Tipo de dato",
            Dimension::Heading => "Rúbricas",
            Dimension::SpecialGroup => "Grupos especiales",
        }
    }

    pub fn matcher(self) -> ColumnMatcher {
        match self {
            Dimension::Location => {
                ColumnMatcher::Exact(&["Comunidades y Ciudades Autónomas", "Provincias"])
            }
            Dimension::Subgroup => ColumnMatcher::Contains("subgrupo"),
            Dimension::EcoicopGroup => ColumnMatcher::Contains("ecoicop"),
            Dimension::DataType => ColumnMatcher::Contains("tipo de dato"),
            Dimension::Heading => ColumnMatcher::Contains("rúbricas"),
            Dimension::SpecialGroup => ColumnMatcher::Contains("grupos especiales"),
        }
    }
}

/// How a dimension finds its column among the table headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMatcher {
    /// Exact header names; the first candidate present in the table wins.
    Exact(&'static [&'static str]),
    /// Lower-case needle matched against lower-cased headers; the first
    /// header in column order wins.
    Contains(&'static str),
}

/// Locate the governing column of a dimension, or `None` to skip it.
pub fn resolve_dimension_column(table: &DataTable, matcher: ColumnMatcher) -> Option<String> {
    match matcher {
        ColumnMatcher::Exact(candidates) => candidates
            .iter()
            .find(|name| table.column_index(name).is_some())
            .map(|name| name.to_string()),
        ColumnMatcher::Contains(needle) => table
            .columns
            .iter()
            .find(|col| col.to_lowercase().contains(needle))
            .cloned(),
    }
}

/// Dimension → column mapping, resolved once per loaded table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionColumns {
    resolved: Vec<(Dimension, String)>,
}

impl DimensionColumns {
    pub fn resolve(table: &DataTable) -> Self {
        let resolved = Dimension::ALL
            .iter()
            .filter_map(|&dim| {
                let column = resolve_dimension_column(table, dim.matcher());
                if column.is_none() {
                    log::debug!("No column for dimension {dim:?}; filter step skipped");
                }
                column.map(|c| (dim, c))
            })
            .collect();
        DimensionColumns { resolved }
    }

    pub fn column(&self, dim: Dimension) -> Option<&str> {
        self.resolved
            .iter()
            .find(|(d, _)| *d == dim)
            .map(|(_, c)| c.as_str())
    }

    /// Resolved dimensions in application order.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &str)> + '_ {
        self.resolved.iter().map(|(d, c)| (*d, c.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// A period range chosen either on the ordered domain or on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodRange {
    /// Inclusive indices into the [`PeriodDomain`].
    ByIndex { start: usize, end: usize },
    /// Inclusive calendar bounds.
    ByDate { from: NaiveDate, to: NaiveDate },
}

/// Everything the user has chosen. An absent or empty selection for a
/// dimension means "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub period: Option<PeriodRange>,
    pub selections: BTreeMap<Dimension, BTreeSet<CellValue>>,
}

// ---------------------------------------------------------------------------
// Pipeline operations
// ---------------------------------------------------------------------------

fn period_label(view: &TableView, row: usize, col: usize) -> Option<String> {
    view.cell(row, col).as_label()
}

/// Distinct non-missing period labels, sorted chronologically.
pub fn build_period_domain(view: &TableView) -> PeriodDomain {
    let Some(col) = view.table.column_index(PERIOD_COLUMN) else {
        return PeriodDomain::default();
    };
    let mut seen = HashSet::new();
    let labels = view
        .rows
        .iter()
        .filter_map(|&r| period_label(view, r, col))
        .filter(|l| seen.insert(l.clone()))
        .collect();
    PeriodDomain::from_distinct_labels(labels)
}

/// Keep rows whose period date falls in `[from, to]`. Undated rows are dropped.
pub fn apply_period_range(view: &TableView, from: NaiveDate, to: NaiveDate) -> TableView {
    let Some(col) = view.table.column_index(PERIOD_COLUMN) else {
        return view.clone();
    };
    let rows = view
        .rows
        .iter()
        .copied()
        .filter(|&r| {
            calendar_date(period_label(view, r, col).as_deref())
                .is_some_and(|d| from <= d && d <= to)
        })
        .collect();
    view.with_rows(rows)
}

/// Keep rows whose order key lies between the keys of two bound labels.
pub fn apply_period_key_range(view: &TableView, lower: &str, upper: &str) -> TableView {
    filter_by_keys(view, order_key(Some(lower)), order_key(Some(upper)))
}

fn filter_by_keys(view: &TableView, lo: PeriodKey, hi: PeriodKey) -> TableView {
    let Some(col) = view.table.column_index(PERIOD_COLUMN) else {
        return view.clone();
    };
    let rows = view
        .rows
        .iter()
        .copied()
        .filter(|&r| {
            let key = order_key(period_label(view, r, col).as_deref());
            lo <= key && key <= hi
        })
        .collect();
    view.with_rows(rows)
}

/// Distinct non-missing values of a column, in encounter order.
pub fn distinct_values(view: &TableView, column: &str) -> Vec<CellValue> {
    let Some(col) = view.table.column_index(column) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    view.rows
        .iter()
        .map(|&r| view.cell(r, col))
        .filter(|v| !v.is_null() && seen.insert(*v))
        .cloned()
        .collect()
}

/// Keep rows whose value in `column` is one of `allowed`. An empty selection
/// leaves the view unchanged.
pub fn apply_categorical(view: &TableView, column: &str, allowed: &BTreeSet<CellValue>) -> TableView {
    if allowed.is_empty() {
        return view.clone();
    }
    let Some(col) = view.table.column_index(column) else {
        return view.clone();
    };
    let rows = view
        .rows
        .iter()
        .copied()
        .filter(|&r| allowed.contains(view.cell(r, col)))
        .collect();
    view.with_rows(rows)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One categorical filter step, as offered to the selector.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionStep {
    pub dimension: Dimension,
    pub column: String,
    /// Distinct values left after every earlier step.
    pub options: Vec<CellValue>,
    /// The part of the stored selection still present among `options`.
    pub selected: BTreeSet<CellValue>,
}

#[derive(Debug, Clone)]
pub struct FilteredView {
    pub domain: PeriodDomain,
    pub steps: Vec<DimensionStep>,
    pub view: TableView,
}

/// Result of running the filter pipeline.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Filtered(FilteredView),
    /// The period range matched no rows. Categorical steps were not evaluated.
    EmptyResult { domain: PeriodDomain },
}

impl PipelineOutcome {
    pub fn domain(&self) -> &PeriodDomain {
        match self {
            PipelineOutcome::Filtered(f) => &f.domain,
            PipelineOutcome::EmptyResult { domain } => domain,
        }
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, PipelineOutcome::EmptyResult { .. })
    }
}

/// Apply the period range, then each resolved dimension in order, each step
/// seeing only the rows left by the previous ones.
pub fn run_pipeline(view: &TableView, dims: &DimensionColumns, state: &FilterState) -> PipelineOutcome {
    let domain = build_period_domain(view);

    let mut current = match (state.period, view.table.column_index(PERIOD_COLUMN)) {
        (Some(range), Some(_)) => {
            let narrowed = match range {
                PeriodRange::ByIndex { start, end } => match domain.key_bounds(start, end) {
                    Some((lo, hi)) => filter_by_keys(view, lo, hi),
                    None => view.with_rows(Vec::new()),
                },
                PeriodRange::ByDate { from, to } => apply_period_range(view, from, to),
            };
            if narrowed.is_empty() {
                log::info!("Period range {range:?} matched no rows");
                return PipelineOutcome::EmptyResult { domain };
            }
            narrowed
        }
        _ => view.clone(),
    };

    let mut steps = Vec::new();
    for (dimension, column) in dims.iter() {
        let options = distinct_values(&current, column);
        let selected: BTreeSet<CellValue> = state
            .selections
            .get(&dimension)
            .map(|chosen| {
                options
                    .iter()
                    .filter(|v| chosen.contains(*v))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        current = apply_categorical(&current, column, &selected);
        steps.push(DimensionStep {
            dimension,
            column: column.to_string(),
            options,
            selected,
        });
    }

    log::debug!(
        "Pipeline kept {} of {} rows over {} steps",
        current.len(),
        view.len(),
        steps.len()
    );

    PipelineOutcome::Filtered(FilteredView {
        domain,
        steps,
        view: current,
    })
}
