use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, DataTable};
use crate::config::SourceConfig;

// ---------------------------------------------------------------------------
// Table catalog
// ---------------------------------------------------------------------------

/// Identifier of a published table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CPI tables offered in the selector.
pub const CATALOG: &[(TableId, &str)] = &[
    (TableId(50913), "IPC por provincias y subgrupos"),
    (TableId(50914), "IPC por comunidades autónomas"),
    (TableId(50915), "IPC por provincias y grupos ECOICOP"),
    (TableId(50916), "IPC por comunidades autónomas y grupos ECOICOP"),
    (TableId(50917), "IPC por provincias y tipo de dato"),
    (TableId(50918), "IPC por comunidades autónomas y tipo de dato"),
    (TableId(50919), "IPC por provincias, grupos ECOICOP y tipo de dato"),
];

pub fn describe(id: TableId) -> Option<&'static str> {
    CATALOG.iter().find(|(t, _)| *t == id).map(|(_, d)| *d)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The table could not be retrieved or read as delimited text.
#[derive(Debug, Error)]
pub enum SourceUnavailable {
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited text")]
    Parse(#[from] csv::Error),
    #[error("row {row} has {found} fields, header has {expected}")]
    RowTooLong {
        row: usize,
        found: usize,
        expected: usize,
    },
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Anything that can produce a table by identifier.
pub trait TableSource {
    fn load(&self, id: TableId) -> Result<DataTable, SourceUnavailable>;
}

/// Fetches `{base_url}/{id}.csv` over HTTP.
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn url_for(&self, id: TableId) -> String {
        format!("{}/{id}.csv", self.base_url)
    }
}

impl TableSource for HttpSource {
    fn load(&self, id: TableId) -> Result<DataTable, SourceUnavailable> {
        let url = self.url_for(id);
        log::info!("Fetching table {id} from {url}");

        let fetch_err = |source| SourceUnavailable::Fetch {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceUnavailable::Status {
                url: url.clone(),
                status,
            });
        }
        let body = response.bytes().map_err(fetch_err)?;
        parse_delimited(body.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Read-through cache
// ---------------------------------------------------------------------------

/// Loaded tables by identifier. Tables never change once loaded, so entries
/// are kept for the whole session.
pub struct TableCache<S> {
    source: S,
    tables: HashMap<TableId, Arc<DataTable>>,
}

impl<S: TableSource> TableCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tables: HashMap::new(),
        }
    }

    pub fn get(&mut self, id: TableId) -> Result<Arc<DataTable>, SourceUnavailable> {
        if let Some(table) = self.tables.get(&id) {
            log::debug!("Table {id} served from cache");
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(self.source.load(id)?);
        log::info!(
            "Loaded table {id}: {} rows, columns {:?}",
            table.len(),
            table.columns
        );
        self.tables.insert(id, Arc::clone(&table));
        Ok(table)
    }

    pub fn contains(&self, id: TableId) -> bool {
        self.tables.contains_key(&id)
    }
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Read a `;`-separated table with one header row. Short rows are padded
/// with `Null`; a row wider than the header is rejected.
pub fn parse_delimited<R: Read>(reader: R) -> Result<DataTable, SourceUnavailable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(SourceUnavailable::RowTooLong {
                row: row_no + 1,
                found: record.len(),
                expected: headers.len(),
            });
        }
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(DataTable::new(headers, rows))
}

/// Missing-value markers, as written by common dataframe tooling.
const NA_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if NA_TOKENS.contains(&s) {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Local snapshots
// ---------------------------------------------------------------------------

/// Open a table saved on disk. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – `;`-separated, as published
/// * `.json` – `[{ "Periodo": "2020M1", "Total": 104.5, ... }, ...]`
pub fn load_file(path: &Path) -> Result<DataTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).map_err(|source| SourceUnavailable::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(parse_delimited(file)?)
        }
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Records-oriented JSON: an array of flat objects. Columns appear in the
/// order they are first seen across records.
fn load_json(path: &Path) -> Result<DataTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(DataTable::new(columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const SAMPLE: &str = "\
Provincias ;Subgrupos ECOICOP;Periodo;Total;Notas
Madrid;01.1.1 Pan y cereales;2020M1;104.5;
Madrid;01.1.1 Pan y cereales;2020M2;105;
Soria;01.1.1 Pan y cereales;2020M1;..;
";

    #[test]
    fn parses_semicolon_text() {
        let table = parse_delimited(SAMPLE.as_bytes()).unwrap();
        // header trimmed, all-empty "Notas" column dropped
        assert_eq!(
            table.columns,
            vec!["Provincias", "Subgrupos ECOICOP", "Periodo", "Total"]
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0][3], CellValue::Float(104.5));
        assert_eq!(table.rows[1][3], CellValue::Integer(105));
        assert_eq!(table.rows[2][3], CellValue::Text("..".into()));
    }

    #[test]
    fn short_rows_are_padded() {
        let text = "Provincias;Periodo;Total\nMadrid;2020M1\nSoria;2020M1;104\n";
        let table = parse_delimited(text.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["Provincias", "Periodo", "Total"]);
        assert_eq!(
            table.rows[0],
            vec![
                CellValue::Text("Madrid".into()),
                CellValue::Text("2020M1".into()),
                CellValue::Null
            ]
        );
    }

    #[test]
    fn wide_rows_are_rejected() {
        let text = "Provincias;Periodo;Total\nMadrid;2020M1;104\nSoria;2020M1;104;EXTRA\n";
        let err = parse_delimited(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            SourceUnavailable::RowTooLong {
                row: 2,
                found: 4,
                expected: 3
            }
        ));
    }

    #[test]
    fn json_columns_keep_file_order() {
        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json_file
            .write_all(
                br#"[{"Total": 1.5, "Subgrupos ECOICOP": "a", "Grupos ECOICOP": "b", "Periodo": "2020"},
                    {"Periodo": "2021", "Notas": "x"}]"#,
            )
            .unwrap();
        let table = load_file(json_file.path()).unwrap();
        assert_eq!(
            table.columns,
            vec!["Total", "Subgrupos ECOICOP", "Grupos ECOICOP", "Periodo", "Notas"]
        );
    }

    #[test]
    fn guesses_cell_types() {
        assert_eq!(guess_cell_type(""), CellValue::Null);
        assert_eq!(guess_cell_type("NaN"), CellValue::Null);
        assert_eq!(guess_cell_type("2020"), CellValue::Integer(2020));
        assert_eq!(guess_cell_type("-0.3"), CellValue::Float(-0.3));
        assert_eq!(guess_cell_type("2020M1"), CellValue::Text("2020M1".into()));
    }

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl TableSource for CountingSource {
        fn load(&self, _id: TableId) -> Result<DataTable, SourceUnavailable> {
            self.calls.set(self.calls.get() + 1);
            parse_delimited(SAMPLE.as_bytes())
        }
    }

    struct BrokenSource;

    impl TableSource for BrokenSource {
        fn load(&self, _id: TableId) -> Result<DataTable, SourceUnavailable> {
            Err(SourceUnavailable::Io {
                path: PathBuf::from("broken.csv"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        }
    }

    #[test]
    fn cache_loads_each_table_once() {
        let mut cache = TableCache::new(CountingSource { calls: Cell::new(0) });
        let first = cache.get(TableId(50913)).unwrap();
        let second = cache.get(TableId(50913)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.contains(TableId(50913)));
        assert!(!cache.contains(TableId(50914)));
        assert_eq!(cache.source.calls.get(), 1);

        cache.get(TableId(50914)).unwrap();
        assert_eq!(cache.source.calls.get(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = TableCache::new(BrokenSource);
        assert!(cache.get(TableId(1)).is_err());
        assert!(!cache.contains(TableId(1)));
    }

    #[test]
    fn http_url_layout() {
        let source = HttpSource::new(&SourceConfig::default()).unwrap();
        assert_eq!(
            source.url_for(TableId(50913)),
            "https://www.ine.es/jaxiT3/files/t/es/csv_bdsc/50913.csv"
        );
    }

    #[test]
    fn catalog_lookup() {
        assert_eq!(describe(TableId(50914)), Some("IPC por comunidades autónomas"));
        assert_eq!(describe(TableId(1)), None);
    }

    #[test]
    fn loads_local_csv_and_json() {
        let mut csv_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        csv_file.write_all(SAMPLE.as_bytes()).unwrap();
        let table = load_file(csv_file.path()).unwrap();
        assert_eq!(table.len(), 3);

        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json_file
            .write_all(br#"[{"Periodo": "2020", "Total": 1.5}, {"Periodo": "2021", "Extra": null}]"#)
            .unwrap();
        let table = load_file(json_file.path()).unwrap();
        assert_eq!(table.columns, vec!["Periodo", "Total"]);
        assert_eq!(table.rows[1], vec![CellValue::Text("2021".into()), CellValue::Null]);
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = NamedTempFile::new().unwrap();
        assert!(load_file(file.path()).is_err());
    }
}
