use std::collections::BTreeMap;

use super::filter::{DimensionColumns, PERIOD_COLUMN};
use super::model::TableView;
use super::period::{order_key, period_axis_value};

/// Numeric column charted over time.
pub const VALUE_COLUMN: &str = "Total";

/// One line of the chart: a combination of dimension values over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    /// `[year axis, value]`, sorted by time.
    pub points: Vec<[f64; 2]>,
}

/// Group the visible rows into one series per combination of dimension
/// values. Rows without a dated period or a numeric value are skipped.
pub fn build_series(view: &TableView, dims: &DimensionColumns) -> Vec<Series> {
    let table = &view.table;
    let (Some(period_col), Some(value_col)) = (
        table.column_index(PERIOD_COLUMN),
        table.column_index(VALUE_COLUMN),
    ) else {
        return Vec::new();
    };

    let mut dim_cols: Vec<usize> = dims
        .iter()
        .filter_map(|(_, column)| table.column_index(column))
        .collect();
    // one header may govern several dimensions
    dim_cols.sort_unstable();
    dim_cols.dedup();

    let mut grouped: BTreeMap<String, Vec<[f64; 2]>> = BTreeMap::new();
    for row in view.iter_rows() {
        let x = period_axis_value(order_key(row[period_col].as_label().as_deref()));
        let (Some(x), Some(y)) = (x, row[value_col].as_f64()) else {
            continue;
        };
        let name = if dim_cols.is_empty() {
            VALUE_COLUMN.to_string()
        } else {
            dim_cols
                .iter()
                .map(|&c| row[c].to_string())
                .collect::<Vec<_>>()
                .join(" · ")
        };
        grouped.entry(name).or_default().push([x, y]);
    }

    grouped
        .into_iter()
        .map(|(name, mut points)| {
            points.sort_by(|a, b| a[0].total_cmp(&b[0]));
            Series { name, points }
        })
        .collect()
}
