//! Key-value persistence for users, tasks and the current session.
//!
//! The tracker keeps three named records: [`USERS_KEY`], [`TASKS_KEY`] and
//! [`CURRENT_USER_KEY`]. Each is stored as one JSON value and is always read and
//! written whole. There is no locking; two processes writing the same store race
//! and the last write wins.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

pub const USERS_KEY: &str = "users";
pub const TASKS_KEY: &str = "tasks";
pub const CURRENT_USER_KEY: &str = "current_user";

/// Synchronous string-keyed store of JSON values.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-process store, used by tests and for throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file on disk.
///
/// Every `set`/`remove` rewrites the whole file through a temp file and rename,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// Read the whole file; a missing file is an empty store.
    fn load(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let buf = fs::read_to_string(&self.path)?;
        if buf.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&buf)?)
    }

    fn save(&self, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(entries)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = self.load()?;
        debug!(key, path = %self.path.display(), "store read");
        Ok(entries.remove(key))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.save(&entries)?;
        debug!(key, path = %self.path.display(), "store write");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
            debug!(key, path = %self.path.display(), "store remove");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_memory_store_get_set_remove() {
        let mut store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", json!([1, 2])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!([1, 2])));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = FileStore::new(&path);
        store.set(TASKS_KEY, json!([{"id": 1}])).unwrap();
        store.set(USERS_KEY, json!([])).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get(TASKS_KEY).unwrap(), Some(json!([{"id": 1}])));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_remove_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("store.json"));
        store.set(CURRENT_USER_KEY, json!({"id": 1})).unwrap();
        store.set(TASKS_KEY, json!([])).unwrap();
        store.remove(CURRENT_USER_KEY).unwrap();
        assert!(store.get(CURRENT_USER_KEY).unwrap().is_none());
        assert_eq!(store.get(TASKS_KEY).unwrap(), Some(json!([])));
    }

    #[test]
    fn test_file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        let store = FileStore::new(&path);
        assert_matches!(store.get(TASKS_KEY), Err(StoreError::Json(_)));
    }

    #[test]
    fn test_store_through_mut_reference() {
        fn write_flag<S: KeyValueStore>(mut store: S) {
            store.set("k", json!(true)).unwrap();
        }

        let mut inner = MemoryStore::new();
        write_flag(&mut inner);
        assert_eq!(inner.get("k").unwrap(), Some(json!(true)));
    }
}
