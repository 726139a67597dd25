//! CSV ingestion and egestion for analysis tables

use sentiscope_core::{AnalysisTable, Cell, Error, Result};
use std::path::{Path, PathBuf};

/// Suffix appended to the input stem for the default output file
pub const OUTPUT_SUFFIX: &str = "_sentiment_analysis.csv";

/// Read a CSV file with a header row into a table.
///
/// Empty fields become missing cells; every other field is kept verbatim
/// as text so pass-through columns are written back unchanged. Numeric
/// columns are parsed on demand through [`Cell::as_number`].
pub fn read_table(path: &Path) -> Result<AnalysisTable> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::table(format!("Failed to open {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| Error::table(format!("Failed to read header of {}: {}", path.display(), e)))?
        .clone();

    let mut table = AnalysisTable::new(headers.iter());
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            Error::table(format!("{}: bad record {}: {}", path.display(), idx + 1, e))
        })?;
        table.push_row(record.iter().map(parse_cell).collect())?;
    }

    tracing::debug!(
        "Read {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Write a table as CSV with a header row; missing cells are empty fields
pub fn write_table(table: &AnalysisTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::table(format!("Failed to create {}: {}", path.display(), e)))?;

    writer.write_record(table.columns()).map_err(csv_write_error)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(Cell::render))
            .map_err(csv_write_error)?;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// `<dir>/<stem>_sentiment_analysis.csv` next to the input file
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feedback".to_string());
    input.with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX))
}

fn parse_cell(field: &str) -> Cell {
    if field.is_empty() {
        Cell::Missing
    } else {
        Cell::Text(field.to_string())
    }
}

fn csv_write_error(e: csv::Error) -> Error {
    Error::table(format!("Failed to write CSV: {}", e))
}
