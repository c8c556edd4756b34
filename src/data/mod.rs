/// Data layer: core types, loading, period parsing and filtering.
///
/// Architecture:
/// ```text
///  INE csv_bdsc URL / local .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch + parse → DataTable (cached by TableId)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ TableView  │  Arc<DataTable>, visible row indices
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐     ┌──────────┐
///   │  filter   │ ◄── │  period   │  label → order key / calendar date
///   └──────────┘     └──────────┘
///        │  period range, then one step per dimension
///        ▼
///   PipelineOutcome ──► series (chart) / export
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod period;
pub mod series;
