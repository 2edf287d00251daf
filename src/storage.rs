//! Key-value persistence for themes, history and the one-shot image handoff.
//!
//! Every write replaces the whole value. Last write wins; there is no locking.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const THEMES_KEY: &str = "glowsnap_saved_themes";
pub const HISTORY_KEY: &str = "glowsnap_command_history";
pub const CLI_IMAGE_KEY: &str = "glowsnap_cli_image";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One file per key inside a directory (`<dir>/<key>.json`)
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        tracing::debug!("Opened key-value store at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// In-process store, used by tests and by sessions without a data directory
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}

/// Load a JSON value, falling back to `T::default()` when it is missing,
/// unreadable or malformed.
pub fn load_json_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring malformed stored value for {}: {}", key, e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("Failed to read stored value for {}: {:#}", key, e);
            T::default()
        }
    }
}

/// Serialize and store a whole value
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).with_context(|| format!("Failed to serialize {}", key))?;
    store.set(key, &raw)
}

/// Read a value and clear it in the same call
pub fn take(store: &dyn KeyValueStore, key: &str) -> Result<Option<String>> {
    let value = store.get(key)?;
    if value.is_some() {
        store.remove(key)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store")).unwrap();

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1,2]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1,2]"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing a missing key is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_malformed_json_loads_default() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        let history: Vec<String> = load_json_or_default(&store, HISTORY_KEY);
        assert!(history.is_empty());
    }

    #[test]
    fn test_wrong_shape_loads_default() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, r#"{"a":1}"#).unwrap();
        let history: Vec<String> = load_json_or_default(&store, HISTORY_KEY);
        assert!(history.is_empty());
    }

    #[test]
    fn test_take_clears_value() {
        let store = MemoryStore::new();
        store.set(CLI_IMAGE_KEY, "data:image/png;base64,AAAA").unwrap();
        assert!(take(&store, CLI_IMAGE_KEY).unwrap().is_some());
        assert!(take(&store, CLI_IMAGE_KEY).unwrap().is_none());
    }
}
