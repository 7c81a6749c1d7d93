//! Persistent key-value stores — one JSON document per entity type.
//!
//! Every store performs whole-document read-modify-write; there are no
//! partial updates and no transactions spanning stores. Writes go through a
//! per-store mutex and land via a temp-file + atomic-rename sequence, so
//! concurrent writers to the same store serialize instead of clobbering each
//! other.
//!
//! The backend is injected: production uses [`FileBackend`], tests use
//! [`MemoryBackend`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store '{name}': {source}")]
    Read {
        name: String,
        source: std::io::Error,
    },

    #[error("failed to write store '{name}': {source}")]
    Write {
        name: String,
        source: std::io::Error,
    },

    #[error("store '{name}' holds malformed JSON: {source}")]
    Corrupt {
        name: String,
        source: serde_json::Error,
    },
}

/// Raw storage for a single store document.
pub trait StorageBackend: Send + Sync {
    /// Name of the store, used in error messages.
    fn name(&self) -> &str;

    /// Read the entire document. `None` means the store has never been written.
    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replace the entire document.
    fn write(&self, contents: &str) -> Result<(), StoreError>;
}

/// File-backed storage. The write path stages the new document in a sibling
/// temp file and renames it into place while holding the store's mutex.
pub struct FileBackend {
    name: String,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Create a backend for the given file path. The parent directory is
    /// created on first write, not here.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read {
                name: self.name.clone(),
                source: e,
            }),
        }
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let wrap = |source| StoreError::Write {
            name: self.name.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(wrap)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = std::fs::File::create(&tmp_path).map_err(wrap)?;
        tmp.write_all(contents.as_bytes()).map_err(wrap)?;
        tmp.sync_all().map_err(wrap)?;
        drop(tmp);

        std::fs::rename(&tmp_path, &self.path).map_err(wrap)
    }
}

/// In-memory storage for tests.
#[derive(Default)]
pub struct MemoryBackend {
    name: String,
    contents: RwLock<Option<String>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: RwLock::new(None),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .contents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        *self.contents.write().unwrap_or_else(|e| e.into_inner()) = Some(contents.to_string());
        Ok(())
    }
}

/// A typed store over a [`StorageBackend`].
///
/// `T::default()` supplies the value of a store that has never been written.
pub struct JsonStore<T> {
    backend: Box<dyn StorageBackend>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Wrap a backend in a typed store.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            _marker: std::marker::PhantomData,
        }
    }

    /// Convenience constructor for a file-backed store.
    pub fn on_disk(name: &str, data_dir: &Path) -> Self {
        let path = data_dir.join(format!("{name}.json"));
        Self::new(Box::new(FileBackend::new(name, path)))
    }

    /// Convenience constructor for an in-memory store.
    pub fn in_memory(name: &str) -> Self {
        Self::new(Box::new(MemoryBackend::new(name)))
    }

    /// Load the full document.
    pub fn load(&self) -> Result<T, StoreError> {
        match self.backend.read()? {
            Some(contents) => {
                serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                    name: self.backend.name().to_string(),
                    source,
                })
            }
            None => Ok(T::default()),
        }
    }

    /// Replace the full document.
    pub fn save(&self, value: &T) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(value).map_err(|source| StoreError::Corrupt {
            name: self.backend.name().to_string(),
            source,
        })?;
        self.backend.write(&contents)
    }

    /// Read-modify-write the full document in one call.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let mut value = self.load()?;
        let result = f(&mut value);
        self.save(&value)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new("test");
        assert!(backend.read().unwrap().is_none());

        backend.write("{\"a\":1}").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_file_backend_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new("quota", dir.path().join("quota.json"));
        assert!(backend.read().unwrap().is_none());
    }

    #[test]
    fn test_file_backend_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keys.json");
        let backend = FileBackend::new("keys", &path);

        backend.write("{}").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("{}"));
        // No temp file left behind
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_json_store_defaults_when_empty() {
        let store: JsonStore<HashMap<String, u64>> = JsonStore::in_memory("counts");
        let value = store.load().unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_json_store_update() {
        let store: JsonStore<HashMap<String, u64>> = JsonStore::in_memory("counts");

        store
            .update(|counts| {
                *counts.entry("alice".to_string()).or_insert(0) += 1;
            })
            .unwrap();
        store
            .update(|counts| {
                *counts.entry("alice".to_string()).or_insert(0) += 1;
            })
            .unwrap();

        let counts = store.load().unwrap();
        assert_eq!(counts.get("alice"), Some(&2));
    }

    #[test]
    fn test_json_store_on_disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Vec<String>> = JsonStore::on_disk("banned_ips", dir.path());

        store
            .update(|ips| ips.push("1.2.3.4".to_string()))
            .unwrap();

        // A fresh store over the same file sees the persisted state
        let reopened: JsonStore<Vec<String>> = JsonStore::on_disk("banned_ips", dir.path());
        assert_eq!(reopened.load().unwrap(), vec!["1.2.3.4".to_string()]);
    }

    #[test]
    fn test_json_store_corrupt_document() {
        let backend = MemoryBackend::new("keys");
        backend.write("not json at all").unwrap();
        let store: JsonStore<HashMap<String, u64>> = JsonStore::new(Box::new(backend));
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }
}
