use crate::error::StorageError;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Key-value store mirrored to a single JSON object on disk. Every write
/// rewrites the file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            read_entries(&path)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens the store, discarding an unreadable file instead of failing.
    pub fn open_or_reset(path: impl Into<PathBuf>) -> (Self, Option<String>) {
        let path = path.into();
        match Self::open(path.clone()) {
            Ok(store) => (store, None),
            Err(err) => (
                Self {
                    path,
                    entries: Mutex::new(BTreeMap::new()),
                },
                Some(err.to_string()),
            ),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        write_atomic(&self.path, entries).map_err(|source| StorageError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    let data = fs::read(path).map_err(|source| StorageError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|err| StorageError::Corrupt {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

pub(crate) fn write_atomic<T: serde::Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    fs::write(&tmp_path, bytes)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if path.exists() {
                fs::remove_file(path)?;
                fs::rename(&tmp_path, path)?;
                Ok(())
            } else {
                Err(rename_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileStore, KeyValueStore, MemoryStore};
    use std::fs;

    #[test]
    fn memory_store_round_trips_and_deletes() {
        let store = MemoryStore::new();
        store.set("ai_status", "completed").expect("set should succeed");
        assert_eq!(store.get("ai_status").as_deref(), Some("completed"));

        store.delete("ai_status").expect("delete should succeed");
        assert!(store.get("ai_status").is_none());
        store.delete("ai_status").expect("deleting a missing key is fine");
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("nested").join("workflow.json");

        let store = FileStore::open(&path).expect("fresh store should open");
        store.set("ai_status", "fetching_mood").expect("set should persist");
        store.set("ai_photo_uploaded", "true").expect("set should persist");
        store.delete("ai_photo_uploaded").expect("delete should persist");
        drop(store);

        let reopened = FileStore::open(&path).expect("existing store should open");
        assert_eq!(reopened.get("ai_status").as_deref(), Some("fetching_mood"));
        assert!(reopened.get("ai_photo_uploaded").is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported_and_replaced_on_reset() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("workflow.json");
        fs::write(&path, "not json").expect("fixture should write");

        let error = FileStore::open(&path).expect_err("corrupt file should fail to open");
        assert!(error.to_string().contains("corrupt"));

        let (store, warning) = FileStore::open_or_reset(&path);
        assert!(warning.is_some());
        assert!(store.get("ai_status").is_none());
        store.set("ai_status", "idle").expect("set should overwrite corrupt file");
        let reopened = FileStore::open(&path).expect("rewritten store should open");
        assert_eq!(reopened.get("ai_status").as_deref(), Some("idle"));
    }
}
