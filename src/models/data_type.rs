//! Column data type tags.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Runtime data type of a table column.
///
/// The canonical tags (`object`, `int64`, `float64`, `bool`, `datetime64`)
/// are what the table reader infers for uploaded columns and what templates
/// declare. Parsing accepts a few friendlier aliases such as `integer` or
/// `date`, but rendering always produces the canonical tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DataType {
    /// Free-form text, or a column mixing several kinds of values
    #[default]
    Object,
    /// 64-bit signed integers with no missing values
    Int64,
    /// Floating point numbers (also integers with missing values)
    Float64,
    /// Booleans with no missing values
    Bool,
    /// Dates and timestamps
    Datetime64,
}

impl DataType {
    /// Returns all data types in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Object,
            Self::Int64,
            Self::Float64,
            Self::Bool,
            Self::Datetime64,
        ]
    }

    /// Returns the canonical tag for this type.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Datetime64 => "datetime64",
        }
    }

    /// Returns a human-readable label for the type picker.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Object => "Text / mixed",
            Self::Int64 => "Integer",
            Self::Float64 => "Float",
            Self::Bool => "Boolean",
            Self::Datetime64 => "Date",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "object" | "str" | "string" | "text" => Ok(Self::Object),
            "int64" | "int" | "integer" => Ok(Self::Int64),
            "float64" | "float" | "double" => Ok(Self::Float64),
            "bool" | "boolean" => Ok(Self::Bool),
            "datetime64" | "datetime64[ns]" | "datetime" | "date" => Ok(Self::Datetime64),
            "" => anyhow::bail!("Data type cannot be empty"),
            other => anyhow::bail!(
                "Unknown data type '{other}' (expected one of: object, int64, float64, bool, datetime64)"
            ),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_tags() {
        for data_type in DataType::all() {
            assert_eq!(data_type.tag().parse::<DataType>().unwrap(), *data_type);
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("integer".parse::<DataType>().unwrap(), DataType::Int64);
        assert_eq!("INT".parse::<DataType>().unwrap(), DataType::Int64);
        assert_eq!(" float ".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("date".parse::<DataType>().unwrap(), DataType::Datetime64);
        assert_eq!("String".parse::<DataType>().unwrap(), DataType::Object);
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert!("decimal".parse::<DataType>().is_err());
        assert!("".parse::<DataType>().is_err());
        assert!("   ".parse::<DataType>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_tag() {
        let json = serde_json::to_string(&DataType::Datetime64).unwrap();
        assert_eq!(json, "\"datetime64\"");

        let parsed: DataType = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(parsed, DataType::Int64);
    }
}
