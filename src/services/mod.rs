//! Service layer for business logic.
//!
//! This module contains services that encapsulate the upload workflow and
//! coordinate between the table reader, the template store and the
//! filesystem.

pub mod auth;
pub mod folders;
pub mod intake;
pub mod sink;
pub mod templates;
pub mod validator;

// Re-export commonly used types and functions
pub use auth::{CredentialCheck, SessionStore};
pub use folders::FolderService;
pub use intake::{IntakeError, IntakeOutcome, IntakeService, Upload};
pub use sink::{FileSink, FolderLocks, MergePolicy, PersistOutcome};
pub use templates::{JsonTemplateStore, MemoryTemplateStore, TemplateStore};
pub use validator::{SchemaValidator, TypeConflict, ValidationMode, ValidationReport};
