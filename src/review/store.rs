//! Persisted key-value counters.

use crate::core::error::StoreError;
use log::warn;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key-value storage for small non-negative counters.
///
/// Read once at start-up and written on every change.
pub trait CounterStore: Send {
    /// Read a counter; `None` if it was never written.
    fn read(&self, key: &str) -> Result<Option<u32>, StoreError>;

    /// Persist a counter.
    fn write(&mut self, key: &str, value: u32) -> Result<(), StoreError>;
}

/// In-process store.
///
/// Clones share the same map, so a test can keep a handle on a store it
/// gave away.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, u32>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one counter.
    pub fn with_value(key: impl Into<String>, value: u32) -> Self {
        let store = Self::new();
        store.values.lock().insert(key.into(), value);
        store
    }

    /// Current value of a counter.
    pub fn get(&self, key: &str) -> Option<u32> {
        self.values.lock().get(key).copied()
    }
}

impl CounterStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<u32>, StoreError> {
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk.
///
/// Unknown keys already in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use the file at `path`. It need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl CounterStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<u32>, StoreError> {
        let map = self.load()?;
        match map.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| StoreError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
        }
    }

    fn write(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        let mut map = match self.load() {
            Ok(map) => map,
            Err(StoreError::Format(e)) => {
                warn!("Replacing malformed store {}: {}", self.path.display(), e);
                Map::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), Value::from(value));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer.write("filter_count", 3).unwrap();
        assert_eq!(store.get("filter_count"), Some(3));
        assert_eq!(store.read("missing").unwrap(), None);
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut store = JsonFileStore::new(&path);

        assert_eq!(store.read("filter_count").unwrap(), None);
        store.write("filter_count", 4).unwrap();
        assert_eq!(store.read("filter_count").unwrap(), Some(4));

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.read("filter_count").unwrap(), Some(4));
    }

    #[test]
    fn test_json_store_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let mut store = JsonFileStore::new(&path);
        store.write("filter_count", 1).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("dark"));
        assert!(text.contains("filter_count"));
    }

    #[test]
    fn test_json_store_rejects_non_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"filter_count": "lots"}"#).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.read("filter_count"),
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_json_store_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.read("filter_count"), Err(StoreError::Format(_))));
    }

    #[test]
    fn test_json_store_write_repairs_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = JsonFileStore::new(&path);
        store.write("filter_count", 2).unwrap();
        assert_eq!(store.read("filter_count").unwrap(), Some(2));

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.read("filter_count").unwrap(), Some(2));
    }
}
