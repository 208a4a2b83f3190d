//! Configuration management for the application.
//!
//! This module handles loading and validating application configuration
//! in TOML format with platform-specific directory resolution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{APP_NAME, CONFIG_DIR_ENV};
use crate::services::auth::hash_password;
use crate::services::sink::MergePolicy;
use crate::services::validator::ValidationMode;

/// Username used when no configuration file exists.
pub const DEFAULT_USERNAME: &str = "admin";

/// Password used when no configuration file exists.
const DEFAULT_PASSWORD: &str = "admin";

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Root directory whose subdirectories are the dataset folders
    pub root: PathBuf,
    /// JSON file holding the templates (defaults to `templates.json` in the config dir)
    #[serde(default)]
    pub templates_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
            templates_file: None,
        }
    }
}

impl StorageConfig {
    /// Resolves the templates file path.
    pub fn templates_path(&self) -> Result<PathBuf> {
        match &self.templates_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_dir()?.join("templates.json")),
        }
    }
}

/// Operator credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Login name
    pub username: String,
    /// Hex SHA-256 digest of the password (see `schemagate hash-password`)
    pub password_sha256: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password_sha256: hash_password(DEFAULT_PASSWORD),
        }
    }
}

impl AuthConfig {
    /// Returns true while the built-in admin/admin pair is in use.
    #[must_use]
    pub fn uses_default_credentials(&self) -> bool {
        self.username == DEFAULT_USERNAME
            && self
                .password_sha256
                .eq_ignore_ascii_case(&hash_password(DEFAULT_PASSWORD))
    }
}

/// Upload handling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngestConfig {
    /// Which combined files an accepted upload updates
    #[serde(default)]
    pub merge_policy: MergePolicy,
    /// How uploaded types are compared with template types
    #[serde(default)]
    pub validation_mode: ValidationMode,
    /// Largest accepted request body, in MiB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    /// Infer ISO date text in CSV uploads as `datetime64` instead of `object`
    #[serde(default)]
    pub parse_csv_dates: bool,
}

/// Default upload limit (50 MiB)
const fn default_max_upload_mb() -> usize {
    50
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            validation_mode: ValidationMode::default(),
            max_upload_mb: default_max_upload_mb(),
            parse_csv_dates: false,
        }
    }
}

impl IngestConfig {
    /// Upload limit in bytes.
    #[must_use]
    pub const fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/SchemaGate/config.toml`
/// - macOS: `~/Library/Application Support/SchemaGate/config.toml`
/// - Windows: `%APPDATA%\SchemaGate\config.toml`
///
/// The directory can be overridden with the `SCHEMAGATE_CONFIG_DIR`
/// environment variable.
///
/// # Validation
///
/// - `storage.root` must exist and be a directory
/// - `auth.username` must not be empty
/// - `auth.password_sha256` must be 64 hex characters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct Config {
    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Operator credentials
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upload handling
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the platform-specific config directory path.
    ///
    /// `SCHEMAGATE_CONFIG_DIR` takes precedence when set.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the default config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        Self::load_from(&config_path)
    }

    /// Loads configuration from a specific file.
    ///
    /// Unlike [`Config::load`], a missing file is an error. The result is
    /// not validated; call [`Config::validate`] before serving requests.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        let root = &self.storage.root;
        if !root.exists() {
            anyhow::bail!("Storage root does not exist: {}", root.display());
        }
        if !root.is_dir() {
            anyhow::bail!("Storage root is not a directory: {}", root.display());
        }
        fs::read_dir(root)
            .with_context(|| format!("Storage root is not readable: {}", root.display()))?;

        if self.ingest.max_upload_mb == 0 {
            anyhow::bail!("ingest.max_upload_mb must be at least 1");
        }

        if self.auth.username.trim().is_empty() {
            anyhow::bail!("auth.username cannot be empty");
        }

        let digest = &self.auth.password_sha256;
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("auth.password_sha256 must be a 64-character hex SHA-256 digest");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_config(root: &Path) -> Config {
        Config {
            storage: StorageConfig {
                root: root.to_path_buf(),
                templates_file: None,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.storage.root, PathBuf::from("storage"));
        assert_eq!(config.auth.username, "admin");
        assert!(config.auth.uses_default_credentials());
        assert_eq!(config.ingest.merge_policy, MergePolicy::AppendAndOverwrite);
        assert_eq!(config.ingest.validation_mode, ValidationMode::Lenient);
        assert_eq!(config.ingest.max_upload_bytes(), 50 * 1024 * 1024);
        assert!(!config.ingest.parse_csv_dates);
    }

    #[test]
    fn test_config_validate() {
        let temp_dir = TempDir::new().unwrap();
        assert!(valid_config(temp_dir.path()).validate().is_ok());
    }

    #[test]
    fn test_config_validate_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let config = valid_config(&temp_dir.path().join("missing"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_root_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(valid_config(&file).validate().is_err());
    }

    #[test]
    fn test_config_validate_credentials() {
        let temp_dir = TempDir::new().unwrap();

        let mut config = valid_config(temp_dir.path());
        config.auth.username = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config(temp_dir.path());
        config.auth.password_sha256 = "admin".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config(temp_dir.path());
        config.auth.password_sha256 = "z".repeat(64);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        fs::write(
            &config_file,
            format!(
                r#"
                [storage]
                root = "/srv/buckets"

                [auth]
                username = "ops"
                password_sha256 = "{}"

                [ingest]
                validation_mode = "strict"
                parse_csv_dates = true
                max_upload_mb = 8
                "#,
                hash_password("pw")
            ),
        )
        .unwrap();

        let loaded = Config::load_from(&config_file).unwrap();
        assert_eq!(loaded.auth.username, "ops");
        assert!(!loaded.auth.uses_default_credentials());
        assert_eq!(loaded.ingest.validation_mode, ValidationMode::Strict);
        assert_eq!(loaded.ingest.merge_policy, MergePolicy::AppendAndOverwrite);
        assert!(loaded.ingest.parse_csv_dates);
        assert_eq!(loaded.ingest.max_upload_bytes(), 8 * 1024 * 1024);
    }

    #[test]
    fn test_config_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from(&temp_dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_config_parse_partial_file() {
        let content = r#"
            [storage]
            root = "/srv/buckets"

            [ingest]
            merge_policy = "raw_only"
        "#;

        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/srv/buckets"));
        assert_eq!(config.ingest.merge_policy, MergePolicy::RawOnly);
        assert_eq!(config.ingest.validation_mode, ValidationMode::Lenient);
        assert!(config.auth.uses_default_credentials());
    }

    #[test]
    fn test_config_rejects_unknown_policy() {
        let content = r#"
            [ingest]
            merge_policy = "sometimes"
        "#;
        assert!(toml::from_str::<Config>(content).is_err());
    }

    #[test]
    fn test_templates_path_explicit() {
        let storage = StorageConfig {
            root: PathBuf::from("x"),
            templates_file: Some(PathBuf::from("/tmp/t.json")),
        };
        assert_eq!(storage.templates_path().unwrap(), PathBuf::from("/tmp/t.json"));
    }
}
