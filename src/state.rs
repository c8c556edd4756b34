use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;

use crate::data::filter::{
    run_pipeline, Dimension, DimensionColumns, DimensionStep, FilterState, PeriodRange,
    PipelineOutcome,
};
use crate::data::loader::{load_file, TableCache, TableId, TableSource};
use crate::data::model::{CellValue, DataTable, TableView};
use crate::data::period::PeriodDomain;
use crate::export::{export_file_name, export_to_path};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Where the current table came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOrigin {
    Published(TableId),
    Local(PathBuf),
}

/// A loaded table plus what is derived from it once per load.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub origin: TableOrigin,
    pub full: TableView,
    pub dims: DimensionColumns,
}

/// How the period range is picked in the side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    Index,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentralTab {
    Table,
    Chart,
}

/// The full UI state, independent of rendering.
pub struct AppState<S> {
    cache: TableCache<S>,

    /// Table chosen in the selector.
    pub selected_table: TableId,

    /// Loaded table (None until a load succeeds).
    pub loaded: Option<LoadedTable>,

    /// User selections.
    pub filters: FilterState,

    /// Result of the last pipeline run (cached).
    pub outcome: Option<PipelineOutcome>,

    pub range_mode: RangeMode,
    pub tab: CentralTab,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl<S: TableSource> AppState<S> {
    pub fn new(source: S, initial: TableId) -> Self {
        Self {
            cache: TableCache::new(source),
            selected_table: initial,
            loaded: None,
            filters: FilterState::default(),
            outcome: None,
            range_mode: RangeMode::Index,
            tab: CentralTab::Table,
            status_message: None,
        }
    }

    /// Load (or fetch from cache) a published table and make it current.
    pub fn select_table(&mut self, id: TableId) {
        self.selected_table = id;
        match self.cache.get(id) {
            Ok(table) => self.set_table(TableOrigin::Published(id), table),
            Err(e) => {
                let e = anyhow::Error::from(e);
                log::error!("Failed to load table {id}: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                self.loaded = None;
                self.outcome = None;
            }
        }
    }

    /// Open a snapshot from disk. Local files bypass the cache.
    pub fn open_file(&mut self, path: &Path) {
        match load_file(path) {
            Ok(table) => {
                log::info!(
                    "Loaded {} rows from {} with columns {:?}",
                    table.len(),
                    path.display(),
                    table.columns
                );
                self.set_table(TableOrigin::Local(path.to_path_buf()), Arc::new(table));
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded table: resolve dimensions, reset selections to
    /// the full period range, run the pipeline.
    pub fn set_table(&mut self, origin: TableOrigin, table: Arc<DataTable>) {
        let full = TableView::full(table);
        let dims = DimensionColumns::resolve(&full.table);
        self.loaded = Some(LoadedTable { origin, full, dims });
        self.filters = FilterState::default();
        self.status_message = None;
        self.refilter();

        let n = self.outcome.as_ref().map_or(0, |o| o.domain().len());
        if n > 0 {
            self.filters.period = Some(PeriodRange::ByIndex { start: 0, end: n - 1 });
            self.refilter();
        }
    }

    /// Recompute the pipeline after any selection change.
    pub fn refilter(&mut self) {
        self.outcome = self
            .loaded
            .as_ref()
            .map(|t| run_pipeline(&t.full, &t.dims, &self.filters));
    }

    pub fn set_index_range(&mut self, start: usize, end: usize) {
        self.filters.period = Some(PeriodRange::ByIndex { start, end });
        self.refilter();
    }

    pub fn set_date_range(&mut self, from: NaiveDate, to: NaiveDate) {
        self.filters.period = Some(PeriodRange::ByDate { from, to });
        self.refilter();
    }

    /// Switch range widgets, carrying the current bounds over. The mode only
    /// changes once a range of that kind has been applied.
    pub fn set_range_mode(&mut self, mode: RangeMode) {
        if mode == self.range_mode {
            return;
        }
        let Some(domain) = self.outcome.as_ref().map(|o| o.domain().clone()) else {
            return;
        };
        match mode {
            RangeMode::Date => {
                let (Some(from), Some(to)) = (domain.first_date(), domain.last_date()) else {
                    log::debug!("No dated periods; keeping index range");
                    return;
                };
                self.set_date_range(from, to);
            }
            RangeMode::Index => {
                if domain.is_empty() {
                    return;
                }
                self.set_index_range(0, domain.len() - 1);
            }
        }
        self.range_mode = mode;
    }

    /// Toggle a single value in a dimension's selection.
    pub fn toggle_value(&mut self, dim: Dimension, value: &CellValue) {
        let selected = self.filters.selections.entry(dim).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Drop a dimension's selection (no restriction).
    pub fn clear_selection(&mut self, dim: Dimension) {
        self.filters.selections.remove(&dim);
        self.refilter();
    }

    /// Rows passing every filter; `None` before a load or on an empty result.
    pub fn visible(&self) -> Option<&TableView> {
        match self.outcome.as_ref()? {
            PipelineOutcome::Filtered(f) => Some(&f.view),
            PipelineOutcome::EmptyResult { .. } => None,
        }
    }

    /// What the filter panel draws: the period domain and, unless the range
    /// emptied the table, the categorical steps. Row indices are not copied.
    pub fn filter_widgets(&self) -> Option<(PeriodDomain, Option<Vec<DimensionStep>>)> {
        match self.outcome.as_ref()? {
            PipelineOutcome::Filtered(f) => Some((f.domain.clone(), Some(f.steps.clone()))),
            PipelineOutcome::EmptyResult { domain } => Some((domain.clone(), None)),
        }
    }

    /// Suggested export file name for the current table.
    pub fn export_name(&self) -> String {
        match self.loaded.as_ref().map(|t| &t.origin) {
            Some(TableOrigin::Local(path)) => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("local");
                format!("tabla_{stem}_filtrada.csv")
            }
            Some(TableOrigin::Published(id)) => export_file_name(*id),
            None => export_file_name(self.selected_table),
        }
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        let Some(view) = self.visible() else {
            anyhow::bail!("no rows to export");
        };
        export_to_path(view, path)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::data::loader::{parse_delimited, SourceUnavailable};

    const TABLE: &str = "\
Comunidades y Ciudades Autónomas;Grupos ECOICOP;Periodo;Total
Aragón;Alimentos;2019;100
Aragón;Alimentos;2020M1;101
Aragón;Vivienda;2020M6;102
Galicia;Alimentos;2020M6;103
Galicia;Vivienda;2021;104
";

    struct FakeSource {
        loads: Rc<Cell<usize>>,
    }

    impl TableSource for FakeSource {
        fn load(&self, id: TableId) -> Result<DataTable, SourceUnavailable> {
            self.loads.set(self.loads.get() + 1);
            if id == TableId(404) {
                return Err(SourceUnavailable::Io {
                    path: PathBuf::from("404.csv"),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            parse_delimited(TABLE.as_bytes())
        }
    }

    fn state_with_counter() -> (AppState<FakeSource>, Rc<Cell<usize>>) {
        let loads = Rc::new(Cell::new(0));
        let source = FakeSource {
            loads: Rc::clone(&loads),
        };
        let mut state = AppState::new(source, TableId(50916));
        state.select_table(TableId(50916));
        (state, loads)
    }

    fn state() -> AppState<FakeSource> {
        state_with_counter().0
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn load_selects_full_period_range() {
        let state = state();
        assert_eq!(
            state.filters.period,
            Some(PeriodRange::ByIndex { start: 0, end: 3 })
        );
        assert_eq!(state.visible().map(TableView::len), Some(5));
    }

    #[test]
    fn reselecting_a_table_hits_the_cache() {
        let (mut state, loads) = state_with_counter();
        state.select_table(TableId(50916));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn load_failure_is_reported() {
        let mut state = state();
        state.select_table(TableId(404));
        assert!(state.loaded.is_none());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
    }

    #[test]
    fn selections_narrow_later_options() {
        let mut state = state();
        state.toggle_value(Dimension::Location, &text("Galicia"));
        let Some(PipelineOutcome::Filtered(out)) = &state.outcome else {
            panic!("expected rows");
        };
        assert_eq!(out.view.len(), 2);
        let ecoicop = out
            .steps
            .iter()
            .find(|s| s.dimension == Dimension::EcoicopGroup)
            .unwrap();
        assert_eq!(ecoicop.options, vec![text("Alimentos"), text("Vivienda")]);

        state.toggle_value(Dimension::Location, &text("Galicia"));
        assert_eq!(state.visible().map(TableView::len), Some(5));
    }

    #[test]
    fn empty_date_range_hides_rows() {
        let mut state = state();
        state.set_date_range(
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(1900, 12, 31).unwrap(),
        );
        assert!(state.outcome.as_ref().unwrap().is_empty_result());
        assert!(state.visible().is_none());
        assert!(state.export(Path::new("unused.csv")).is_err());
    }

    #[test]
    fn switching_to_dates_keeps_every_row() {
        let mut state = state();
        state.set_range_mode(RangeMode::Date);
        assert_eq!(state.range_mode, RangeMode::Date);
        assert!(matches!(
            state.filters.period,
            Some(PeriodRange::ByDate { .. })
        ));
        assert_eq!(state.visible().map(TableView::len), Some(5));
    }

    #[test]
    fn date_mode_needs_dated_periods() {
        let mut state = state();
        let undated = "Provincias;Periodo;Total\nSoria;provisional;1\nSoria;definitivo;2\n";
        state.set_table(
            TableOrigin::Local(PathBuf::from("undated.csv")),
            Arc::new(parse_delimited(undated.as_bytes()).unwrap()),
        );
        state.set_range_mode(RangeMode::Date);
        assert_eq!(state.range_mode, RangeMode::Index);
        assert!(matches!(
            state.filters.period,
            Some(PeriodRange::ByIndex { .. })
        ));
        assert_eq!(state.visible().map(TableView::len), Some(2));
    }

    #[test]
    fn filter_widgets_follow_outcome() {
        let mut state = AppState::new(
            FakeSource {
                loads: Rc::new(Cell::new(0)),
            },
            TableId(50916),
        );
        assert!(state.filter_widgets().is_none());

        state.select_table(TableId(50916));
        let (domain, steps) = state.filter_widgets().unwrap();
        assert_eq!(domain.len(), 4);
        let steps = steps.unwrap();
        assert_eq!(steps[0].dimension, Dimension::Location);
        assert_eq!(steps[0].options, vec![text("Aragón"), text("Galicia")]);

        state.set_date_range(
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(1900, 12, 31).unwrap(),
        );
        let (domain, steps) = state.filter_widgets().unwrap();
        assert_eq!(domain.len(), 4);
        assert!(steps.is_none());
    }

    #[test]
    fn export_names_follow_origin() {
        let mut state = state();
        assert_eq!(state.export_name(), "tabla_50916_filtrada.csv");
        state.set_table(
            TableOrigin::Local(PathBuf::from("/tmp/ipc.csv")),
            Arc::new(parse_delimited(TABLE.as_bytes()).unwrap()),
        );
        assert_eq!(state.export_name(), "tabla_ipc_filtrada.csv");
    }

    #[test]
    fn export_writes_filtered_rows() {
        let mut state = state();
        state.set_index_range(3, 3);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(state.export_name());
        state.export(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.ends_with("Galicia;Vivienda;2021;104\n"));
    }
}
