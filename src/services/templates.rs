//! Template storage.
//!
//! Templates are keyed by folder name. The store is injected into the web
//! layer and the intake service as a trait object so the backend can be
//! swapped: [`JsonTemplateStore`] loads from a JSON file at startup and
//! saves after every edit, [`MemoryTemplateStore`] keeps templates for the
//! lifetime of the process only.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::models::Template;

/// Storage for per-folder templates.
pub trait TemplateStore: Send + Sync {
    /// Returns the stored template for a folder, if any.
    fn get(&self, folder: &str) -> Option<Template>;

    /// Stores a template, replacing any previous one for the folder.
    fn put(&self, folder: &str, template: Template) -> Result<()>;

    /// Returns every stored template, ordered by folder name.
    fn list(&self) -> Vec<(String, Template)>;

    /// Returns the stored template, or an empty one without storing it.
    fn get_or_default(&self, folder: &str) -> Template {
        self.get(folder).unwrap_or_default()
    }
}

/// Process-lifetime template store.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<BTreeMap<String, Template>>,
}

impl MemoryTemplateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn get(&self, folder: &str) -> Option<Template> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(folder)
            .cloned()
    }

    fn put(&self, folder: &str, template: Template) -> Result<()> {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(folder.to_string(), template);
        Ok(())
    }

    fn list(&self) -> Vec<(String, Template)> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(folder, template)| (folder.clone(), template.clone()))
            .collect()
    }
}

/// Template store persisted to a JSON file.
///
/// The whole map is rewritten after every `put` using a temp file + rename,
/// so the file on disk always holds a complete snapshot.
#[derive(Debug)]
pub struct JsonTemplateStore {
    path: PathBuf,
    templates: RwLock<BTreeMap<String, Template>>,
}

impl JsonTemplateStore {
    /// Opens the store, loading existing templates from `path`.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let templates = if path.exists() {
            let content = fs::read_to_string(&path).with_context(|| {
                format!("Failed to read templates file: {}", path.display())
            })?;
            serde_json::from_str(&content).with_context(|| {
                format!("Failed to parse templates file: {}", path.display())
            })?
        } else {
            BTreeMap::new()
        };

        info!(
            "Loaded {} template(s) from {}",
            templates.len(),
            path.display()
        );

        Ok(Self {
            path,
            templates: RwLock::new(templates),
        })
    }

    fn save(&self, templates: &BTreeMap<String, Template>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create templates directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(templates).context("Failed to serialize templates")?;

        let temp_path = self.path.with_extension("json.tmp");

        // Write to temp file
        fs::write(&temp_path, content).with_context(|| {
            format!("Failed to write temp templates file: {}", temp_path.display())
        })?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename temp templates file to: {}",
                self.path.display()
            )
        })?;

        debug!("Saved templates to {}", self.path.display());
        Ok(())
    }
}

impl TemplateStore for JsonTemplateStore {
    fn get(&self, folder: &str) -> Option<Template> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(folder)
            .cloned()
    }

    fn put(&self, folder: &str, template: Template) -> Result<()> {
        let mut templates = self
            .templates
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut updated = templates.clone();
        updated.insert(folder.to_string(), template);

        // Only commit in memory once the snapshot is on disk
        self.save(&updated)?;
        *templates = updated;
        Ok(())
    }

    fn list(&self) -> Vec<(String, Template)> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(folder, template)| (folder.clone(), template.clone()))
            .collect()
    }
}
