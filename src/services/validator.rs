//! Schema validation of uploaded tables against folder templates.
//!
//! Two modes are available:
//!
//! - **Lenient** (default): column names are compared as sets, and so are
//!   data types. An upload passes when every uploaded column name appears
//!   somewhere in the template and every uploaded type tag is declared by
//!   *some* template column. Types are not paired with names, so a column
//!   declared `float64` accepts `int64` data as long as another template
//!   column declares `int64`.
//! - **Strict**: names are compared as sets as above, and each uploaded
//!   column must also carry exactly the type declared for that name (first
//!   template column with the name wins).
//!
//! Missing template columns are never an error: an upload may carry a
//! subset of the template's columns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{DataType, Template};
use crate::table::Table;

/// How uploaded types are compared with declared types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Set difference over distinct type tags
    #[default]
    Lenient,
    /// Per-column name + type pairing
    Strict,
}

/// A column whose type differs from the declared type (strict mode only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeConflict {
    /// Column name
    pub column: String,
    /// Type declared by the template
    pub expected: DataType,
    /// Type inferred from the upload
    pub found: DataType,
}

/// Everything the validator looked at, plus its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Mode the report was produced with
    pub mode: ValidationMode,
    /// Uploaded column names, in file order
    pub uploaded_columns: Vec<String>,
    /// Inferred uploaded types, in file order
    pub uploaded_data_types: Vec<DataType>,
    /// Template column names, in template order
    pub template_columns: Vec<String>,
    /// Declared template types, in template order
    pub template_data_types: Vec<DataType>,
    /// Uploaded column names absent from the template
    pub mismatched_columns: BTreeSet<String>,
    /// Uploaded type tags not covered by the template
    pub mismatched_data_types: BTreeSet<DataType>,
    /// Per-column type conflicts (strict mode only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_conflicts: Vec<TypeConflict>,
    /// Whether the upload passed
    pub accepted: bool,
}

/// Compares uploaded tables with templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator {
    mode: ValidationMode,
}

impl SchemaValidator {
    /// Creates a validator for the given mode.
    #[must_use]
    pub const fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    /// Validates a table against a template.
    pub fn validate(&self, table: &Table, template: &Template) -> ValidationReport {
        let uploaded_columns = table.headers().to_vec();
        let uploaded_data_types = table.dtypes();

        let template_names = template.column_name_set();
        let mismatched_columns: BTreeSet<String> = uploaded_columns
            .iter()
            .filter(|name| !template_names.contains(name.as_str()))
            .cloned()
            .collect();

        let (mismatched_data_types, type_conflicts): (BTreeSet<DataType>, Vec<TypeConflict>) =
            match self.mode {
                ValidationMode::Lenient => {
                    let declared = template.data_type_set();
                    let mismatched = uploaded_data_types
                        .iter()
                        .filter(|data_type| !declared.contains(*data_type))
                        .copied()
                        .collect();
                    (mismatched, Vec::new())
                }
                ValidationMode::Strict => {
                    let conflicts: Vec<TypeConflict> = uploaded_columns
                        .iter()
                        .zip(&uploaded_data_types)
                        .filter_map(|(name, found)| {
                            let expected = template.declared_type(name)?;
                            (expected != *found).then(|| TypeConflict {
                                column: name.clone(),
                                expected,
                                found: *found,
                            })
                        })
                        .collect();
                    let mismatched = conflicts.iter().map(|c| c.found).collect();
                    (mismatched, conflicts)
                }
            };

        let accepted = mismatched_columns.is_empty() && mismatched_data_types.is_empty();

        let report = ValidationReport {
            mode: self.mode,
            uploaded_columns,
            uploaded_data_types,
            template_columns: template.column_names(),
            template_data_types: template.data_types(),
            mismatched_columns,
            mismatched_data_types,
            type_conflicts,
            accepted,
        };

        debug!(
            uploaded_columns = ?report.uploaded_columns,
            uploaded_data_types = ?report.uploaded_data_types,
            template_columns = ?report.template_columns,
            template_data_types = ?report.template_data_types,
            mismatched_columns = ?report.mismatched_columns,
            mismatched_data_types = ?report.mismatched_data_types,
            accepted = report.accepted,
            "Schema validation finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::delimited::read_csv;

    fn sales_template() -> Template {
        Template::from_columns([
            ("id", DataType::Int64),
            ("amount", DataType::Float64),
            ("region", DataType::Object),
        ])
    }

    #[test]
    fn test_matching_upload_is_accepted() {
        let table = read_csv(b"id,amount,region\n1,9.5,North\n2,3.25,South\n").unwrap();
        let report = SchemaValidator::default().validate(&table, &sales_template());

        assert!(report.accepted);
        assert!(report.mismatched_columns.is_empty());
        assert!(report.mismatched_data_types.is_empty());
        assert_eq!(report.uploaded_columns, vec!["id", "amount", "region"]);
        assert_eq!(report.template_data_types.len(), 3);
    }

    #[test]
    fn test_empty_template_rejects_any_column() {
        let table = read_csv(b"only\nx\n").unwrap();
        let report = SchemaValidator::default().validate(&table, &Template::new());

        assert!(!report.accepted);
        assert_eq!(
            report.mismatched_columns,
            BTreeSet::from(["only".to_string()])
        );
        assert_eq!(
            report.mismatched_data_types,
            BTreeSet::from([DataType::Object])
        );
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let table = read_csv(b"id,amount,region,notes\n1,9.5,North,x\n").unwrap();
        let report = SchemaValidator::default().validate(&table, &sales_template());

        assert!(!report.accepted);
        assert_eq!(
            report.mismatched_columns,
            BTreeSet::from(["notes".to_string()])
        );
        assert!(report.mismatched_data_types.is_empty());
    }

    #[test]
    fn test_subset_of_template_columns_is_accepted() {
        let table = read_csv(b"id,region\n1,North\n").unwrap();
        assert!(SchemaValidator::default().validate(&table, &sales_template()).accepted);
    }

    #[test]
    fn test_lenient_mode_ignores_column_pairing() {
        // amount is declared float64 but uploaded as int64; int64 is declared for id
        let table = read_csv(b"id,amount,region\n1,10,North\n2,20,South\n").unwrap();
        let report =
            SchemaValidator::new(ValidationMode::Lenient).validate(&table, &sales_template());

        assert_eq!(
            report.uploaded_data_types,
            vec![DataType::Int64, DataType::Int64, DataType::Object]
        );
        assert!(report.accepted);
    }

    #[test]
    fn test_lenient_mode_rejects_undeclared_type() {
        let table = read_csv(b"id,amount,region\n1,9.5,true\n").unwrap();
        let report = SchemaValidator::default().validate(&table, &sales_template());

        assert!(!report.accepted);
        assert_eq!(report.mismatched_data_types, BTreeSet::from([DataType::Bool]));
    }

    #[test]
    fn test_strict_mode_checks_each_column() {
        let table = read_csv(b"id,amount,region\n1,10,North\n2,20,South\n").unwrap();
        let report =
            SchemaValidator::new(ValidationMode::Strict).validate(&table, &sales_template());

        assert!(!report.accepted);
        assert_eq!(
            report.type_conflicts,
            vec![TypeConflict {
                column: "amount".to_string(),
                expected: DataType::Float64,
                found: DataType::Int64,
            }]
        );
        assert_eq!(report.mismatched_data_types, BTreeSet::from([DataType::Int64]));
    }

    #[test]
    fn test_strict_mode_accepts_exact_types() {
        let table = read_csv(b"id,amount,region\n1,10.5,North\n").unwrap();
        let report =
            SchemaValidator::new(ValidationMode::Strict).validate(&table, &sales_template());

        assert!(report.accepted);
        assert!(report.type_conflicts.is_empty());
    }
}
