//! Persistence of accepted uploads.
//!
//! Every accepted upload is written verbatim into its folder. Depending on
//! the [`MergePolicy`], the parsed table is then also appended to the
//! folder's append-mode combined file and written alone to its
//! overwrite-mode combined file.
//!
//! The read-modify-write on the combined files runs under a per-folder
//! mutex, so concurrent uploads to the same folder cannot lose rows. The
//! raw file write is last-writer-wins. Writes are not atomic: a crash
//! between steps can leave the three files out of step with each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{COMBINED_APPEND_FILE, COMBINED_OVERWRITE_FILE};
use crate::table::{delimited, Table};

/// Which files an accepted upload updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Raw file, then append-mode and overwrite-mode combined files
    #[default]
    AppendAndOverwrite,
    /// Raw file only
    RawOnly,
}

/// Paths written for one accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistOutcome {
    /// The raw uploaded file
    pub raw_file: PathBuf,
    /// Append-mode combined file, if updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appended_file: Option<PathBuf>,
    /// Overwrite-mode combined file, if updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwritten_file: Option<PathBuf>,
    /// Row count of the append-mode file after the merge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_rows: Option<usize>,
}

/// One mutex per folder, created on first use.
#[derive(Debug, Default)]
pub struct FolderLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FolderLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for a folder.
    pub fn lock_for(&self, folder: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(folder.to_string()).or_default())
    }
}

/// Writes accepted uploads into folders under the storage root.
#[derive(Debug)]
pub struct FileSink {
    root: PathBuf,
    policy: MergePolicy,
    locks: FolderLocks,
}

impl FileSink {
    /// Creates a sink rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, policy: MergePolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            locks: FolderLocks::new(),
        }
    }

    /// Persists an accepted upload.
    ///
    /// The folder must already exist under the root and `filename` must be
    /// a plain file name; both are checked by the caller.
    pub fn persist(
        &self,
        folder: &str,
        filename: &str,
        bytes: &[u8],
        table: &Table,
    ) -> Result<PersistOutcome> {
        let folder_path = self.root.join(folder);

        // (a) raw bytes, overwriting any file of the same name
        let raw_file = folder_path.join(filename);
        std::fs::write(&raw_file, bytes)
            .with_context(|| format!("Failed to write uploaded file: {}", raw_file.display()))?;
        debug!("Wrote raw upload {}", raw_file.display());

        let mut outcome = PersistOutcome {
            raw_file,
            appended_file: None,
            overwritten_file: None,
            combined_rows: None,
        };

        if self.policy == MergePolicy::RawOnly {
            return Ok(outcome);
        }

        let lock = self.locks.lock_for(folder);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // (b) append-merge
        let appended_file = folder_path.join(COMBINED_APPEND_FILE);
        let combined_rows = append_to_file(&appended_file, table)?;

        // (c) overwrite-merge
        let overwritten_file = folder_path.join(COMBINED_OVERWRITE_FILE);
        delimited::write_csv_file(table, &overwritten_file)?;

        info!(
            "Merged {} row(s) into folder '{}' ({} row(s) combined)",
            table.row_count(),
            folder,
            combined_rows
        );

        outcome.appended_file = Some(appended_file);
        outcome.overwritten_file = Some(overwritten_file);
        outcome.combined_rows = Some(combined_rows);
        Ok(outcome)
    }
}

/// Appends `table` below the content of the CSV at `path` (if present).
///
/// Returns the row count of the resulting file.
pub fn append_to_file(path: &Path, table: &Table) -> Result<usize> {
    let combined = if path.exists() {
        delimited::read_csv_file(path)?.concat(table)
    } else {
        table.clone()
    };

    delimited::write_csv_file(&combined, path)?;
    Ok(combined.row_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::delimited::{read_csv, read_csv_file};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("sales");
        fs::create_dir(&folder).unwrap();
        (temp_dir, folder)
    }

    #[test]
    fn test_append_adds_rows() {
        let (_temp_dir, folder) = setup();
        let path = folder.join(COMBINED_APPEND_FILE);

        let a = read_csv(b"x,y\n1,2\n3,4\n").unwrap();
        let b = read_csv(b"x,y\n5,6\n7,8\n9,10\n").unwrap();

        assert_eq!(append_to_file(&path, &a).unwrap(), 2);
        assert_eq!(append_to_file(&path, &b).unwrap(), 5);

        let combined = read_csv_file(&path).unwrap();
        assert_eq!(combined.row_count(), 5);
        assert_eq!(combined.headers(), &["x", "y"]);
    }

    #[test]
    fn test_persist_full_policy_writes_all_files() {
        let (temp_dir, folder) = setup();
        let sink = FileSink::new(temp_dir.path(), MergePolicy::AppendAndOverwrite);

        let bytes = b"id,amount\n1,9.5\n";
        let table = read_csv(bytes).unwrap();
        let outcome = sink.persist("sales", "jan.csv", bytes, &table).unwrap();

        assert_eq!(fs::read(folder.join("jan.csv")).unwrap(), bytes);
        assert_eq!(outcome.raw_file, folder.join("jan.csv"));
        assert_eq!(outcome.appended_file, Some(folder.join(COMBINED_APPEND_FILE)));
        assert_eq!(
            outcome.overwritten_file,
            Some(folder.join(COMBINED_OVERWRITE_FILE))
        );
        assert_eq!(outcome.combined_rows, Some(1));
    }

    #[test]
    fn test_persist_overwrite_keeps_only_latest() {
        let (temp_dir, folder) = setup();
        let sink = FileSink::new(temp_dir.path(), MergePolicy::AppendAndOverwrite);

        let mut big = String::from("id\n");
        for i in 0..100 {
            big.push_str(&format!("{i}\n"));
        }
        let big_table = read_csv(big.as_bytes()).unwrap();
        sink.persist("sales", "big.csv", big.as_bytes(), &big_table)
            .unwrap();

        let small = b"id\n7\n";
        let small_table = read_csv(small).unwrap();
        let outcome = sink.persist("sales", "small.csv", small, &small_table).unwrap();

        let overwritten = read_csv_file(&folder.join(COMBINED_OVERWRITE_FILE)).unwrap();
        assert_eq!(overwritten.row_count(), 1);
        assert_eq!(outcome.combined_rows, Some(101));
    }

    #[test]
    fn test_persist_raw_only_policy() {
        let (temp_dir, folder) = setup();
        let sink = FileSink::new(temp_dir.path(), MergePolicy::RawOnly);

        let bytes = b"id\n1\n";
        let table = read_csv(bytes).unwrap();
        let outcome = sink.persist("sales", "one.csv", bytes, &table).unwrap();

        assert!(folder.join("one.csv").exists());
        assert!(!folder.join(COMBINED_APPEND_FILE).exists());
        assert!(!folder.join(COMBINED_OVERWRITE_FILE).exists());
        assert_eq!(outcome.appended_file, None);
    }

    #[test]
    fn test_persist_overwrites_raw_file_of_same_name() {
        let (temp_dir, folder) = setup();
        let sink = FileSink::new(temp_dir.path(), MergePolicy::RawOnly);

        let first = b"id\n1\n";
        let second = b"id\n2\n";
        sink.persist("sales", "d.csv", first, &read_csv(first).unwrap())
            .unwrap();
        sink.persist("sales", "d.csv", second, &read_csv(second).unwrap())
            .unwrap();

        assert_eq!(fs::read(folder.join("d.csv")).unwrap(), second);
    }

    #[test]
    fn test_concurrent_appends_do_not_lose_rows() {
        let (temp_dir, folder) = setup();
        let sink = Arc::new(FileSink::new(temp_dir.path(), MergePolicy::AppendAndOverwrite));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    let bytes = format!("id,worker\n{i},{i}\n{i},{i}\n");
                    let table = read_csv(bytes.as_bytes()).unwrap();
                    sink.persist("sales", &format!("w{i}.csv"), bytes.as_bytes(), &table)
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let combined = read_csv_file(&folder.join(COMBINED_APPEND_FILE)).unwrap();
        assert_eq!(combined.row_count(), 16);
    }

    #[test]
    fn test_folder_locks_are_shared_per_folder() {
        let locks = FolderLocks::new();
        let a1 = locks.lock_for("a");
        let a2 = locks.lock_for("a");
        let b = locks.lock_for("b");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
