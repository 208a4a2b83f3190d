//! Column templates for dataset folders.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_TEMPLATE_COLUMNS;
use crate::models::DataType;

/// One expected column of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ColumnSpec {
    /// Expected column name (may be empty, duplicates are allowed)
    pub name: String,
    /// Declared data type
    pub data_type: DataType,
}

impl ColumnSpec {
    /// Creates a new column spec.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Operator input for one visible column of the template editor.
///
/// The type is kept as raw text so that the editor can report which
/// column carried an unknown tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInput {
    /// New column name
    pub name: String,
    /// New data type tag (canonical tag or alias)
    pub data_type: String,
}

/// Expected columns for uploads into one folder.
///
/// Column names and declared types are stored as pairs, so the two lists
/// can never drift to different lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Template {
    /// Ordered column definitions
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a template from (name, type) pairs.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, DataType)>,
        S: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, data_type)| ColumnSpec::new(name, data_type))
                .collect(),
        }
    }

    /// Column names in template order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Declared types in template order.
    pub fn data_types(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }

    /// Distinct column names.
    pub fn column_name_set(&self) -> BTreeSet<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Distinct declared types.
    pub fn data_type_set(&self) -> BTreeSet<DataType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }

    /// Declared type of the first column with the given name.
    pub fn declared_type(&self, name: &str) -> Option<DataType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.data_type)
    }

    /// Applies one submission of the template editor.
    ///
    /// The column list grows with default entries (empty name, `object`)
    /// until it holds at least `column_count` entries. It never shrinks:
    /// stored columns past `column_count` stay in the template. Each input
    /// at a visible index (`< column_count`) replaces the name and the type
    /// at that index; inputs past `column_count` are ignored.
    ///
    /// All type tags are parsed before anything is modified, so a failed
    /// edit leaves the template untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if `column_count` is zero or above
    /// [`MAX_TEMPLATE_COLUMNS`], or any visible input has an unknown type tag.
    pub fn apply_edit(&mut self, column_count: usize, inputs: &[ColumnInput]) -> Result<()> {
        if column_count == 0 {
            anyhow::bail!("Number of columns must be at least 1");
        }
        if column_count > MAX_TEMPLATE_COLUMNS {
            anyhow::bail!("Number of columns must be at most {MAX_TEMPLATE_COLUMNS}");
        }

        let parsed = inputs
            .iter()
            .take(column_count)
            .enumerate()
            .map(|(i, input)| {
                let data_type = input
                    .data_type
                    .parse::<DataType>()
                    .with_context(|| format!("Column {} has an invalid data type", i + 1))?;
                Ok(ColumnSpec::new(input.name.clone(), data_type))
            })
            .collect::<Result<Vec<_>>>()?;

        if self.columns.len() < column_count {
            self.columns.resize_with(column_count, ColumnSpec::default);
        }

        for (slot, spec) in self.columns.iter_mut().zip(parsed) {
            *slot = spec;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, data_type: &str) -> ColumnInput {
        ColumnInput {
            name: name.to_string(),
            data_type: data_type.to_string(),
        }
    }

    #[test]
    fn test_apply_edit_grows_with_defaults() {
        let mut template = Template::new();
        template.apply_edit(3, &[input("id", "int")]).unwrap();

        assert_eq!(template.columns.len(), 3);
        assert_eq!(template.columns[0], ColumnSpec::new("id", DataType::Int64));
        assert_eq!(template.columns[1], ColumnSpec::default());
        assert_eq!(template.columns[2].data_type, DataType::Object);
    }

    #[test]
    fn test_apply_edit_never_shrinks() {
        let mut template = Template::from_columns([
            ("a", DataType::Object),
            ("b", DataType::Int64),
            ("c", DataType::Float64),
        ]);

        template.apply_edit(1, &[input("renamed", "float")]).unwrap();

        assert_eq!(template.columns.len(), 3);
        assert_eq!(template.columns[0], ColumnSpec::new("renamed", DataType::Float64));
        assert_eq!(template.columns[1], ColumnSpec::new("b", DataType::Int64));
        assert_eq!(template.columns[2], ColumnSpec::new("c", DataType::Float64));
    }

    #[test]
    fn test_apply_edit_ignores_inputs_past_count() {
        let mut template = Template::new();
        template
            .apply_edit(1, &[input("a", "object"), input("b", "nonsense")])
            .unwrap();

        assert_eq!(template.columns, vec![ColumnSpec::new("a", DataType::Object)]);
    }

    #[test]
    fn test_apply_edit_rejects_zero_count() {
        let mut template = Template::new();
        assert!(template.apply_edit(0, &[]).is_err());
        assert!(template.columns.is_empty());
    }

    #[test]
    fn test_apply_edit_rejects_oversized_count() {
        let mut template = Template::from_columns([("a", DataType::Object)]);

        let err = template.apply_edit(usize::MAX, &[]).unwrap_err();
        assert!(err.to_string().contains("at most"));
        assert!(template.apply_edit(MAX_TEMPLATE_COLUMNS + 1, &[]).is_err());
        assert_eq!(template.columns.len(), 1);

        template.apply_edit(MAX_TEMPLATE_COLUMNS, &[]).unwrap();
        assert_eq!(template.columns.len(), MAX_TEMPLATE_COLUMNS);
    }

    #[test]
    fn test_apply_edit_unknown_type_leaves_template_unchanged() {
        let mut template = Template::from_columns([("a", DataType::Object)]);
        let before = template.clone();

        let err = template
            .apply_edit(2, &[input("x", "int"), input("y", "money")])
            .unwrap_err();

        assert!(format!("{err:#}").contains("Column 2"));
        assert_eq!(template, before);
    }

    #[test]
    fn test_apply_edit_allows_empty_and_duplicate_names() {
        let mut template = Template::new();
        template
            .apply_edit(3, &[input("", "object"), input("x", "int"), input("x", "float")])
            .unwrap();

        assert_eq!(template.column_names(), vec!["", "x", "x"]);
        assert_eq!(template.declared_type("x"), Some(DataType::Int64));
        assert_eq!(template.column_name_set().len(), 2);
    }
}
