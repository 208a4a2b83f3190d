//! Data models for templates and column data types.
//!
//! This module contains the core data structures shared by the table reader,
//! the template store and the schema validator. Models are independent of the
//! web layer and of the storage backends.

pub mod data_type;
pub mod template;

// Re-export all model types
pub use data_type::DataType;
pub use template::{ColumnInput, ColumnSpec, Template};
