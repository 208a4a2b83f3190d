//! Comma-separated file reading and writing.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

use super::{Cell, ReadOptions, Table};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses UTF-8 comma-separated bytes with a header row, using default options.
pub fn read_csv(bytes: &[u8]) -> Result<Table> {
    read_csv_with(bytes, ReadOptions::default())
}

/// Parses UTF-8 comma-separated bytes with a header row.
///
/// Blank lines are skipped and short rows are padded with empty cells.
/// Date text stays text unless `options.csv_dates` is set.
///
/// # Errors
///
/// Returns an error if the input has no header row, is not valid UTF-8,
/// or contains a row with more fields than the header.
pub fn read_csv_with(bytes: &[u8], options: ReadOptions) -> Result<Table> {
    let parse: fn(&str) -> Cell = if options.csv_dates {
        Cell::parse_with_dates
    } else {
        Cell::parse
    };

    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(String::from)
        .collect();

    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        anyhow::bail!("CSV file has no header row");
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", i + 1))?;

        if record.len() == 1 && record[0].trim().is_empty() && headers.len() > 1 {
            continue;
        }

        rows.push(record.iter().map(parse).collect());
    }

    Table::new(headers, rows)
}

/// Reads a CSV file from disk.
pub fn read_csv_file(path: &Path) -> Result<Table> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    read_csv(&bytes).with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}

/// Writes a table as CSV (header row first) to any writer.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    writer
        .write_record(table.headers())
        .context("Failed to write CSV header row")?;

    for row in table.rows() {
        writer
            .write_record(row.iter().map(ToString::to_string))
            .context("Failed to write CSV record")?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Writes a table to a CSV file, replacing any existing content.
pub fn write_csv_file(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    write_csv(table, file).with_context(|| format!("Failed to write CSV file: {}", path.display()))
}
