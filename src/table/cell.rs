//! Typed table cells.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Text values treated as missing when reading uploaded data.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Datetime layouts accepted in text cells, tried in order.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single value of an uploaded table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing value
    Empty,
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Date or timestamp (dates are stored at midnight)
    DateTime(NaiveDateTime),
    /// Anything else, kept verbatim
    Text(String),
}

impl Cell {
    /// Types a raw text field the way delimited files are read.
    ///
    /// Missing tokens become `Empty`; integers, floats and `true`/`false`
    /// in any case become their typed variants; everything else, dates
    /// included, is kept as text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::parse_field(raw, false)
    }

    /// Like [`Cell::parse`], but ISO dates and datetimes become `DateTime`.
    #[must_use]
    pub fn parse_with_dates(raw: &str) -> Self {
        Self::parse_field(raw, true)
    }

    fn parse_field(raw: &str, dates: bool) -> Self {
        let trimmed = raw.trim();

        if is_missing(trimmed) {
            return Self::Empty;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Self::Float(value);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if dates {
            if let Some(value) = parse_datetime(trimmed) {
                return Self::DateTime(value);
            }
        }

        Self::Text(raw.to_string())
    }

    /// Wraps a spreadsheet text value, mapping missing tokens to `Empty`.
    ///
    /// Unlike [`Cell::parse`], numbers stored as text stay text.
    #[must_use]
    pub fn text(value: &str) -> Self {
        if is_missing(value.trim()) {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl fmt::Display for Cell {
    /// Renders the value as a CSV field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) if value.is_nan() => Ok(()),
            Self::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::DateTime(value) if value.time() == NaiveTime::MIN => {
                write!(f, "{}", value.format("%Y-%m-%d"))
            }
            Self::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Text(value) => f.write_str(value),
        }
    }
}

fn is_missing(trimmed: &str) -> bool {
    MISSING_TOKENS.contains(&trimmed)
}

/// Parses an ISO date or datetime.
pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
