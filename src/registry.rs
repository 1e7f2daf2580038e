//! Pocket Registry
//!
//! File-existence based discovery and deletion of stores, independent of any
//! open session. Operates purely on the two-file naming convention; it never
//! opens a store to validate its contents.

use std::fs;
use std::path::Path;

use crate::engine::{store_paths, INDEX_EXT};

/// Which backing files [`delete_store`] managed to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedFiles {
    pub index: bool,
    pub block: bool,
}

impl RemovedFiles {
    /// True when both backing files are gone
    pub fn complete(&self) -> bool {
        self.index && self.block
    }
}

/// Best-effort deletion of a store's backing files
///
/// Failures (file missing, file in use) are logged and reflected in the
/// returned flags, never raised. Removing only one of the two files leaves
/// the store inconsistent; that outcome gets its own warning and is visible
/// as `index != block` in the result.
pub fn delete_store(name: &str, location: &Path) -> RemovedFiles {
    let (index_path, block_path) = store_paths(name, location);

    let index = match fs::remove_file(&index_path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(name, error = %e, "could not delete index file");
            false
        }
    };
    let block = match fs::remove_file(&block_path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(name, error = %e, "could not delete block file");
            false
        }
    };

    let removed = RemovedFiles { index, block };
    if index != block {
        tracing::warn!(
            name,
            index_removed = index,
            block_removed = block,
            "store left inconsistent: only one backing file was deleted"
        );
    }
    removed
}

/// Names of every store found in `location`
///
/// Scans for files carrying the index extension and strips it. An unreadable
/// or missing directory yields an empty list rather than an error.
pub fn list_stores(location: &Path) -> Vec<String> {
    let entries = match fs::read_dir(location) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(location = %location.display(), error = %e, "could not scan for stores");
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(INDEX_EXT) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store_paths;
    use tempfile::TempDir;

    fn touch_store(name: &str, dir: &Path) {
        let (index, block) = store_paths(name, dir);
        std::fs::write(index, b"").unwrap();
        std::fs::write(block, b"").unwrap();
    }

    #[test]
    fn lists_store_names_without_extension() {
        let dir = TempDir::new().unwrap();
        touch_store("alpha", dir.path());
        touch_store("beta", dir.path());
        std::fs::write(dir.path().join("unrelated.txt"), b"").unwrap();

        assert_eq!(list_stores(dir.path()), vec!["alpha", "beta"]);
    }

    #[test]
    fn listing_a_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_stores(&missing).is_empty());
    }

    #[test]
    fn delete_removes_both_files() {
        let dir = TempDir::new().unwrap();
        touch_store("gamma", dir.path());

        let removed = delete_store("gamma", dir.path());
        assert!(removed.complete());
        assert!(list_stores(dir.path()).is_empty());
    }

    #[test]
    fn deleting_a_missing_store_reports_partial_flags() {
        let dir = TempDir::new().unwrap();
        let removed = delete_store("ghost", dir.path());
        assert!(!removed.index);
        assert!(!removed.block);
    }

    #[test]
    fn deleting_half_a_store_is_flagged_inconsistent() {
        let dir = TempDir::new().unwrap();
        let (index, _) = store_paths("half", dir.path());
        std::fs::write(index, b"").unwrap();

        let removed = delete_store("half", dir.path());
        assert!(removed.index);
        assert!(!removed.block);
        assert!(!removed.complete());
    }
}
