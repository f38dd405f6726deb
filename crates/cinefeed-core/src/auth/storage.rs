use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Named slots of the durable credential storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    Token,
    UserId,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Token, Slot::UserId];

    pub fn key(&self) -> &'static str {
        match self {
            Slot::Token => "token",
            Slot::UserId => "userId",
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored session is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Durable client-side key/value storage for the credential.
///
/// Missing values are `Ok(None)`, not errors. Removing a missing slot is a
/// no-op.
pub trait CredentialStorage: Send + Sync {
    fn get(&self, slot: Slot) -> Result<Option<String>, StorageError>;
    fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError>;
    fn remove(&self, slot: Slot) -> Result<(), StorageError>;
}

/// Stores both slots as a JSON object in `session.json`.
pub struct FileStorage {
    cache_dir: PathBuf,
    // Serialises read-modify-write of the file
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn read_map(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Like `read_map`, but a corrupt file reads as empty so the next write
    /// replaces it. I/O failures still propagate.
    fn read_map_for_update(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        match Self::read_map(path) {
            Err(StorageError::Json(e)) => {
                warn!(path = %path.display(), error = %e, "Replacing corrupt session file");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_map(path: &Path, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if map.is_empty() {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

impl CredentialStorage for FileStorage {
    fn get(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let map = Self::read_map(&self.path())?;
        Ok(map.get(slot.key()).cloned())
    }

    fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.path();
        let mut map = Self::read_map_for_update(&path)?;
        map.insert(slot.key().to_string(), value.to_string());
        Self::write_map(&path, &map)
    }

    fn remove(&self, slot: Slot) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.path();
        let mut map = Self::read_map_for_update(&path)?;
        map.remove(slot.key());
        Self::write_map(&path, &map)
    }
}

/// In-process storage; nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<BTreeMap<Slot, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with a token and user id.
    pub fn with_credential(token: &str, user_id: &str) -> Self {
        let storage = Self::default();
        {
            let mut slots = storage.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.insert(Slot::Token, token.to_string());
            slots.insert(Slot::UserId, user_id.to_string());
        }
        storage
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slots.get(&slot).cloned())
    }

    fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&self, slot: Slot) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(&slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_keys() {
        assert_eq!(Slot::Token.key(), "token");
        assert_eq!(Slot::UserId.key(), "userId");
    }

    #[test]
    fn test_file_storage_set_get_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get(Slot::Token).unwrap(), None);

        storage.set(Slot::Token, "abc123").unwrap();
        storage.set(Slot::UserId, "u1").unwrap();
        assert_eq!(storage.get(Slot::Token).unwrap().as_deref(), Some("abc123"));
        assert_eq!(storage.get(Slot::UserId).unwrap().as_deref(), Some("u1"));

        let contents = std::fs::read_to_string(storage.path()).unwrap();
        assert!(contents.contains("\"token\": \"abc123\""));
        assert!(contents.contains("\"userId\": \"u1\""));

        storage.remove(Slot::Token).unwrap();
        storage.remove(Slot::UserId).unwrap();
        assert_eq!(storage.get(Slot::Token).unwrap(), None);
        assert!(!storage.path().exists(), "empty session file should be deleted");

        // Removing again is fine
        storage.remove(Slot::Token).unwrap();
    }

    #[test]
    fn test_file_storage_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf());
        std::fs::write(storage.path(), "{not json").unwrap();

        assert!(matches!(storage.get(Slot::Token), Err(StorageError::Json(_))));

        // Writing replaces the corrupt contents
        storage.set(Slot::Token, "fresh").unwrap();
        assert_eq!(storage.get(Slot::Token).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_file_storage_io_error_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf());
        // A directory where the file should be makes every read fail with I/O
        std::fs::create_dir(storage.path()).unwrap();

        assert!(matches!(storage.set(Slot::Token, "fresh"), Err(StorageError::Io(_))));
        assert!(matches!(storage.remove(Slot::Token), Err(StorageError::Io(_))));
        assert!(storage.path().is_dir());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::with_credential("t", "u");
        assert_eq!(storage.get(Slot::Token).unwrap().as_deref(), Some("t"));
        storage.remove(Slot::Token).unwrap();
        assert_eq!(storage.get(Slot::Token).unwrap(), None);
        assert_eq!(storage.get(Slot::UserId).unwrap().as_deref(), Some("u"));
    }
}
