use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a published table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. Published tables are not strongly typed, so a
/// column may mix text and numbers.
/// Used as a key in `BTreeSet` / `HashSet` downstream, so it must be `Ord` and `Hash`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Textual form of a non-missing cell. A period column read as integers
    /// (annual tables) still yields `"2020"`, not `"2020.0"`.
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Numeric reading of the cell, for charting.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DataTable – the loaded, immutable table
// ---------------------------------------------------------------------------

/// A loaded table. Rows are aligned to `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    /// Build a table, trimming header names and dropping columns that hold
    /// no value at all. Short rows are padded with `Null`.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, CellValue::Null);
        }

        let keep: Vec<bool> = (0..width)
            .map(|c| rows.iter().any(|row| !row[c].is_null()))
            .collect();

        let columns = columns
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(name, _)| name.trim().to_string())
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v)
                    .collect()
            })
            .collect();

        DataTable { columns, rows }
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TableView – a filtered window onto a DataTable
// ---------------------------------------------------------------------------

/// Row indices into a shared, immutable table. Filtering produces new views;
/// the table itself is never touched.
#[derive(Debug, Clone)]
pub struct TableView {
    pub table: Arc<DataTable>,
    pub rows: Vec<usize>,
}

impl TableView {
    /// A view showing every row of the table.
    pub fn full(table: Arc<DataTable>) -> Self {
        let rows = (0..table.len()).collect();
        TableView { table, rows }
    }

    /// Same table, a different row selection.
    pub fn with_rows(&self, rows: Vec<usize>) -> Self {
        TableView {
            table: Arc::clone(&self.table),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }

    /// Visible rows, in table order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[CellValue]> + '_ {
        self.rows.iter().map(|&i| self.table.rows[i].as_slice())
    }

    /// Cell of a visible row by column position.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        &self.table.rows[row][col]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
