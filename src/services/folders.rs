//! Dataset folder enumeration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Service for the dataset folders under the storage root.
///
/// Folders are pre-existing directories; this service never creates them.
pub struct FolderService;

impl FolderService {
    /// Lists the names of directories directly under `root`, sorted by name.
    ///
    /// Hidden directories (leading `.`) and plain files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be read. Callers treat this as an
    /// environment failure.
    pub fn list(root: &Path) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(root)
            .with_context(|| format!("Failed to read storage root: {}", root.display()))?;

        let mut folders = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };

            if !entry.path().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            folders.push(name);
        }

        folders.sort();
        Ok(folders)
    }

    /// Resolves a folder name to its directory, checking that it exists.
    pub fn resolve(root: &Path, name: &str) -> Result<PathBuf> {
        validate_path_component(name).context("Invalid folder name")?;

        let path = root.join(name);
        if !path.is_dir() {
            anyhow::bail!("Folder not found: {name}");
        }
        Ok(path)
    }
}

/// Validates a single path component to prevent path traversal.
///
/// Used for folder names and uploaded file names alike.
pub fn validate_path_component(name: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("Name cannot be empty");
    }

    // Reject path traversal attempts
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        anyhow::bail!("Invalid name '{name}': path traversal not allowed");
    }

    if name.starts_with('.') {
        anyhow::bail!("Invalid name '{name}': hidden files not allowed");
    }

    if name.contains('\0') {
        anyhow::bail!("Invalid name: NUL bytes not allowed");
    }

    Ok(())
}
