//! The upload workflow: format check, parse, validate, persist.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::services::folders::{validate_path_component, FolderService};
use crate::services::sink::{FileSink, PersistOutcome};
use crate::services::templates::TemplateStore;
use crate::services::validator::{SchemaValidator, ValidationReport};
use crate::table::{ReadOptions, UploadFormat};

/// A file received from the operator.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original file name, used for format detection and the raw copy
    pub filename: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

/// Result of an accepted upload.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeOutcome {
    /// Target folder
    pub folder: String,
    /// Original file name
    pub filename: String,
    /// Detected format
    pub format: UploadFormat,
    /// Number of data rows in the upload
    pub rows: usize,
    /// Validation details
    pub report: ValidationReport,
    /// Files written
    pub persisted: PersistOutcome,
}

/// Reasons an upload is not persisted.
#[derive(Debug)]
pub enum IntakeError {
    /// Folder or file name fails path validation
    InvalidName(String),
    /// Folder does not exist under the storage root
    FolderNotFound(String),
    /// Extension is not `csv` or `xlsx`; nothing was parsed
    UnsupportedFormat(String),
    /// File could not be read as a table
    Parse(anyhow::Error),
    /// Table does not match the folder template; nothing was written
    SchemaMismatch(Box<ValidationReport>),
    /// Filesystem failure while persisting
    Environment(anyhow::Error),
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName(reason) => write!(f, "Invalid name: {reason}"),
            Self::FolderNotFound(folder) => write!(f, "Folder not found: {folder}"),
            Self::UnsupportedFormat(filename) => write!(
                f,
                "Invalid file format for '{filename}'. Allowed formats are xlsx and csv."
            ),
            Self::Parse(err) => write!(f, "Failed to parse uploaded file: {err:#}"),
            Self::SchemaMismatch(_) => f.write_str(
                "Column names and/or data types of the uploaded file do not match the template.",
            ),
            Self::Environment(err) => write!(f, "Failed to store uploaded file: {err:#}"),
        }
    }
}

impl std::error::Error for IntakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) | Self::Environment(err) => Some(&**err),
            _ => None,
        }
    }
}

/// Runs uploads through validation and into the file sink.
pub struct IntakeService {
    root: PathBuf,
    templates: Arc<dyn TemplateStore>,
    validator: SchemaValidator,
    sink: FileSink,
    read_options: ReadOptions,
}

impl IntakeService {
    /// Creates the service.
    pub fn new(
        root: impl Into<PathBuf>,
        templates: Arc<dyn TemplateStore>,
        validator: SchemaValidator,
        sink: FileSink,
    ) -> Self {
        Self {
            root: root.into(),
            templates,
            validator,
            sink,
            read_options: ReadOptions::default(),
        }
    }

    /// Sets how uploaded files are parsed.
    #[must_use]
    pub fn with_read_options(mut self, read_options: ReadOptions) -> Self {
        self.read_options = read_options;
        self
    }

    /// Validates an upload against the folder template and persists it.
    pub fn ingest(&self, folder: &str, upload: &Upload) -> Result<IntakeOutcome, IntakeError> {
        validate_path_component(folder)
            .map_err(|e| IntakeError::InvalidName(format!("{e:#}")))?;
        validate_path_component(&upload.filename)
            .map_err(|e| IntakeError::InvalidName(format!("{e:#}")))?;

        if FolderService::resolve(&self.root, folder).is_err() {
            return Err(IntakeError::FolderNotFound(folder.to_string()));
        }

        let format = UploadFormat::from_filename(&upload.filename)
            .ok_or_else(|| IntakeError::UnsupportedFormat(upload.filename.clone()))?;

        let table = format
            .read(&upload.bytes, self.read_options)
            .map_err(IntakeError::Parse)?;

        let template = self.templates.get_or_default(folder);
        let report = self.validator.validate(&table, &template);

        if !report.accepted {
            warn!(
                "Rejected '{}' for folder '{}': mismatched columns {:?}, mismatched data types {:?}",
                upload.filename, folder, report.mismatched_columns, report.mismatched_data_types
            );
            return Err(IntakeError::SchemaMismatch(Box::new(report)));
        }

        let persisted = self
            .sink
            .persist(folder, &upload.filename, &upload.bytes, &table)
            .map_err(IntakeError::Environment)?;

        info!(
            "Accepted '{}' ({} row(s)) into folder '{}'",
            upload.filename,
            table.row_count(),
            folder
        );

        Ok(IntakeOutcome {
            folder: folder.to_string(),
            filename: upload.filename.clone(),
            format,
            rows: table.row_count(),
            report,
            persisted,
        })
    }
}
