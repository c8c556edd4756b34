use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::data::loader::TableId;
use crate::data::model::TableView;

/// Suggested download name for a filtered table.
pub fn export_file_name(id: TableId) -> String {
    format!("tabla_{id}_filtrada.csv")
}

/// Write the visible rows as `;`-separated text with one header row.
/// Missing cells become empty fields.
pub fn write_delimited<W: Write>(view: &TableView, writer: W) -> Result<()> {
    let mut out = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);

    out.write_record(view.columns()).context("writing header")?;
    for row in view.iter_rows() {
        out.write_record(row.iter().map(|cell| cell.to_string()))
            .context("writing row")?;
    }
    out.flush().context("flushing export")?;
    Ok(())
}

pub fn export_to_path(view: &TableView, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_delimited(view, std::io::BufWriter::new(file))?;
    log::info!("Exported {} rows to {}", view.len(), path.display());
    Ok(())
}
