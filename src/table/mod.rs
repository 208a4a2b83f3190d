//! In-memory tables read from uploaded files.
//!
//! A [`Table`] is a header row plus rows of typed [`Cell`]s. Column data
//! types are inferred from the cells on demand, so a table read back from a
//! combined CSV file reports the same types as the upload it came from.
//!
//! Two upload formats are supported (see [`UploadFormat`]): comma-delimited
//! UTF-8 text with a header row, and Excel workbooks (first worksheet).

pub mod cell;
pub mod delimited;
pub mod workbook;

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::Serialize;

use crate::models::DataType;

pub use cell::Cell;

/// Parsing options for uploaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOptions {
    /// Type ISO date text in CSV fields as datetimes (workbook dates are always typed)
    pub csv_dates: bool,
}

/// Supported upload file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadFormat {
    /// Comma-separated values
    Csv,
    /// Excel Open XML workbook
    Xlsx,
}

impl UploadFormat {
    /// Detects the format from a filename's extension (case-insensitive).
    ///
    /// Returns `None` for unsupported extensions and for names without one.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, extension) = filename.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Parses raw upload bytes in this format.
    pub fn read(self, bytes: &[u8], options: ReadOptions) -> Result<Table> {
        match self {
            Self::Csv => delimited::read_csv_with(bytes, options),
            Self::Xlsx => workbook::read_xlsx(bytes),
        }
    }
}

/// Tabular data with named columns.
///
/// Every row holds exactly one cell per header; shorter rows are padded
/// with [`Cell::Empty`] on construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates a table from raw headers and rows.
    ///
    /// Headers are normalized: a blank header becomes `Unnamed: {index}`
    /// and repeated headers get `.1`, `.2`, ... suffixes.
    ///
    /// # Errors
    ///
    /// Returns an error if a row has more cells than there are headers.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let headers = normalize_headers(headers);
        let width = headers.len();

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut row)| {
                if row.len() > width {
                    anyhow::bail!(
                        "Row {} has {} fields but the header defines {} columns",
                        i + 1,
                        row.len(),
                        width
                    );
                }
                row.resize(width, Cell::Empty);
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers, rows })
    }

    /// Column names in order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Inferred data type of every column, in header order.
    pub fn dtypes(&self) -> Vec<DataType> {
        (0..self.headers.len())
            .map(|col| infer_dtype(self.rows.iter().map(|row| &row[col])))
            .collect()
    }

    /// Appends the rows of `other` below the rows of `self`.
    ///
    /// Columns are matched by name. The result has every column of `self`
    /// followed by the columns only `other` has; cells missing on either
    /// side are empty. Rows are not de-duplicated.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut headers = self.headers.clone();
        for header in &other.headers {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }

        let width = headers.len();
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut rows = Vec::with_capacity(self.rows.len() + other.rows.len());
        for table in [self, other] {
            for row in &table.rows {
                let mut merged = vec![Cell::Empty; width];
                for (header, cell) in table.headers.iter().zip(row) {
                    merged[positions[header.as_str()]] = cell.clone();
                }
                rows.push(merged);
            }
        }

        Self { headers, rows }
    }
}

/// Infers a column type from its cells.
///
/// - no cells at all: `object`
/// - only missing values: `float64`
/// - integers: `int64`, or `float64` when values are missing
/// - integers and floats: `float64`
/// - booleans: `bool`, or `object` when values are missing
/// - dates and datetimes: `datetime64`
/// - text or a mix of the groups above: `object`
fn infer_dtype<'a>(cells: impl Iterator<Item = &'a Cell>) -> DataType {
    let mut seen_any = false;
    let mut missing = false;
    let mut ints = false;
    let mut floats = false;
    let mut bools = false;
    let mut dates = false;

    for cell in cells {
        seen_any = true;
        match cell {
            Cell::Empty => missing = true,
            Cell::Int(_) => ints = true,
            Cell::Float(_) => floats = true,
            Cell::Bool(_) => bools = true,
            Cell::DateTime(_) => dates = true,
            Cell::Text(_) => return DataType::Object,
        }
    }

    let numeric = ints || floats;
    let groups = [numeric, bools, dates].iter().filter(|g| **g).count();

    match groups {
        0 if !seen_any => DataType::Object,
        0 => DataType::Float64,
        1 if floats || (ints && missing) => DataType::Float64,
        1 if ints => DataType::Int64,
        1 if bools && missing => DataType::Object,
        1 if bools => DataType::Bool,
        1 => DataType::Datetime64,
        _ => DataType::Object,
    }
}

/// Makes header names non-blank and unique.
fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut normalized = Vec::with_capacity(headers.len());

    for (i, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            header
        };

        let mut name = base.clone();
        while used.contains(&name) {
            let count = counts.entry(base.clone()).or_insert(0);
            *count += 1;
            name = format!("{base}.{count}");
        }

        used.insert(name.clone());
        normalized.push(name);
    }

    normalized
}
