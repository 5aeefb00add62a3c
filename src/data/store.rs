use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};

use super::loader::load_file;
use super::model::Dataset;
use crate::error::SchemaError;

/// File identity used to decide whether a cached load is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("reading metadata of {}", path.display()))?;
        Ok(Fingerprint {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug)]
struct Entry {
    fingerprint: Fingerprint,
    dataset: Arc<Dataset>,
}

/// Loads listing tables once per session, keyed by path.
///
/// A repeated load of an unchanged file returns the cached dataset without
/// reading it again; a file whose modification time or length changed is
/// reloaded.
#[derive(Debug, Default)]
pub struct RecordStore {
    entries: HashMap<PathBuf, Entry>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<S: AsRef<str>>(&mut self, path: &Path, required: &[S]) -> Result<Arc<Dataset>> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let fingerprint = Fingerprint::of(&key)?;

        if let Some(entry) = self.entries.get(&key) {
            if entry.fingerprint == fingerprint {
                log::debug!("cache hit for {}", key.display());
                // The same file may back several dashboards with different schemas.
                let missing = entry.dataset.missing_columns(required);
                if !missing.is_empty() {
                    return Err(SchemaError { missing }.into());
                }
                return Ok(Arc::clone(&entry.dataset));
            }
            log::info!("{} changed on disk, reloading", key.display());
        }

        let dataset = Arc::new(load_file(&key, required)?);
        self.entries.insert(
            key,
            Entry {
                fingerprint,
                dataset: Arc::clone(&dataset),
            },
        );
        Ok(dataset)
    }

    /// Forget the cached dataset of `path`.
    pub fn invalidate(&mut self, path: &Path) {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, body: &str) {
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn repeated_load_returns_cached_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.csv");
        write(&path, "Location,Price\nA,1\n");

        let mut store = RecordStore::new();
        let first = store.load(&path, &["Price"]).unwrap();
        let second = store.load(&path, &["Price"]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn changed_file_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.csv");
        write(&path, "Location,Price\nA,1\n");

        let mut store = RecordStore::new();
        let first = store.load(&path, &["Price"]).unwrap();
        write(&path, "Location,Price\nA,1\nB,22\n");
        let second = store.load(&path, &["Price"]).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn cached_dataset_is_checked_against_new_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.csv");
        write(&path, "Location,Price\nA,1\n");

        let mut store = RecordStore::new();
        store.load(&path, &["Price"]).unwrap();
        let err = store.load(&path, &["Price", "Url"]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SchemaError>().map(|e| e.missing.clone()),
            Some(vec!["Url".to_string()])
        );
    }

    #[test]
    fn invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.csv");
        write(&path, "Location,Price\nA,1\n");

        let mut store = RecordStore::new();
        let first = store.load(&path, &["Price"]).unwrap();
        store.invalidate(&path);
        assert!(store.is_empty());
        let second = store.load(&path, &["Price"]).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RecordStore::new();
        assert!(store.load::<&str>(&dir.path().join("nope.csv"), &[]).is_err());
    }

    #[test]
    fn clear_forces_a_fresh_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.csv");
        write(&path, "Location,Price\nA,1\n");

        let mut store = RecordStore::new();
        let first = store.load(&path, &["Price"]).unwrap();
        store.clear();
        assert!(store.is_empty());
        let second = store.load(&path, &["Price"]).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }
}
