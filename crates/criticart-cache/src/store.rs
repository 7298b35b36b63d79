//! Persistent key-value storage with automatic serialization.
//!
//! Plays the role browser local storage plays for the site: small string
//! values (theme preference, cached session) read once at startup and written
//! on toggle, login and logout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::CacheError;

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Get a value. Returns `None` if the key doesn't exist.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        (**self).remove(key)
    }
}

/// Volatile store, used in tests and when no storage path is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store persisted as a JSON object in a single file.
///
/// The file is read once on open and rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating an empty one if the file is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(CacheError::OpenError(format!("{}: {}", path.display(), e)));
            }
        };
        debug!(path = %path.display(), keys = values.len(), "opened key-value store");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(values)?)?;
        Ok(())
    }
}

fn poisoned() -> CacheError {
    CacheError::StoreError("store lock poisoned".to_string())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

/// Type-safe wrapper storing values as JSON.
#[derive(Debug, Clone)]
pub struct JsonStore<S> {
    inner: S,
}

impl<S: KeyValueStore> JsonStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get and deserialize a value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.inner.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and set a value.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.inner.set(key, &raw)
    }

    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key)
    }

    /// Get the raw string value.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key)
    }

    /// Set a raw string value.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.inner.set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        token: String,
    }

    // === Memory Store ===

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("theme").unwrap(), None);
        store.set("theme", "dark").unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        store.remove("theme").unwrap();
        store.remove("theme").unwrap();
        assert_eq!(store.get("theme").unwrap(), None);
    }

    #[test]
    fn test_json_store_typed_values() {
        let store = JsonStore::new(MemoryStore::new());
        let session = Session {
            user: "u1".to_string(),
            token: "jwt".to_string(),
        };
        store.set("user", &session).unwrap();
        assert_eq!(store.get::<Session>("user").unwrap(), Some(session));
        assert!(store.get::<Session>("missing").unwrap().is_none());
    }

    #[test]
    fn test_json_store_rejects_corrupt_value() {
        let store = JsonStore::new(MemoryStore::new());
        store.set_raw("user", "{not json").unwrap();
        assert!(matches!(
            store.get::<Session>("user"),
            Err(CacheError::SerializeError(_))
        ));
    }

    // === File Store ===

    #[test]
    fn test_file_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.set("theme", "dark").unwrap();
        store.set("user", "{}").unwrap();
        store.remove("user").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(reopened.get("user").unwrap(), None);
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, b"[1, 2").unwrap();
        assert!(FileStore::open(&path).is_err());
    }

    #[test]
    fn test_shared_store_through_arc() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let json = JsonStore::new(store.clone());
        json.set("count", &3u32).unwrap();
        assert_eq!(store.get("count").unwrap().as_deref(), Some("3"));
    }
}
