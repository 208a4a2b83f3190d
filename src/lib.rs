//! SchemaGate Library
//!
//! This library provides the core functionality of SchemaGate: reading
//! uploaded CSV/XLSX tables, keeping per-folder column templates, validating
//! uploads against those templates and merging accepted data into combined
//! per-folder files. The `web` feature adds the HTTP API and embedded UI.

// Module declarations
pub mod config;
pub mod constants;
pub mod models;
pub mod services;
pub mod table;
#[cfg(feature = "web")]
pub mod web;
