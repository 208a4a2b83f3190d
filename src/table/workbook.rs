//! Excel workbook reading.

use std::io::Cursor;

use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use super::{cell, Cell, Table};

/// Parses the first worksheet of an `.xlsx` workbook.
///
/// The first row is the header. Cell types stored in the workbook are kept:
/// integral numbers become integers, dates become datetimes, and text cells
/// stay text even when they look numeric.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable workbook or the
/// workbook has no worksheet.
pub fn read_xlsx(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(bytes)).context("Failed to open XLSX workbook")?;

    let range = workbook
        .worksheet_range_at(0)
        .context("XLSX workbook has no worksheets")?
        .context("Failed to read first worksheet")?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(header_text).collect())
        .unwrap_or_default();

    if headers.is_empty() {
        anyhow::bail!("XLSX worksheet has no header row");
    }

    let rows = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Table::new(headers, rows)
}

/// Renders a header cell as a column name.
fn header_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        other => convert_cell(other).to_string(),
    }
}

/// Converts a workbook cell into a table cell.
fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(value) => Cell::Int(*value),
        Data::Float(value) => float_cell(*value),
        Data::Bool(value) => Cell::Bool(*value),
        Data::String(value) => Cell::text(value),
        Data::DateTime(value) => {
            if value.is_duration() {
                Cell::Float(value.as_f64())
            } else {
                value
                    .as_datetime()
                    .map_or_else(|| Cell::Float(value.as_f64()), Cell::DateTime)
            }
        }
        Data::DateTimeIso(value) => cell::parse_datetime(value)
            .map_or_else(|| Cell::Text(value.clone()), Cell::DateTime),
        Data::DurationIso(value) => Cell::Text(value.clone()),
        Data::Error(error) => Cell::text(&error.to_string()),
    }
}

/// Spreadsheets store every number as a float; whole numbers read as integers.
fn float_cell(value: f64) -> Cell {
    const I64_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

    if value.is_finite() && value.fract() == 0.0 && value.abs() <= I64_LIMIT {
        Cell::Int(value as i64)
    } else {
        Cell::Float(value)
    }
}
