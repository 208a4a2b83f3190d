//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the application name and the fixed storage file names.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "SchemaGate";

/// The binary name of the application (used in command examples, lowercase).
pub const APP_BINARY_NAME: &str = "schemagate";

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "SCHEMAGATE_CONFIG_DIR";

/// Combined file that accumulates every accepted upload of a folder.
pub const COMBINED_APPEND_FILE: &str = "combined_data_1.csv";

/// Combined file that holds only the most recent accepted upload of a folder.
pub const COMBINED_OVERWRITE_FILE: &str = "combined_data.csv";

/// Largest column count the template editor accepts.
pub const MAX_TEMPLATE_COLUMNS: usize = 1000;
