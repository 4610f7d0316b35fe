//! Key/value durable storage backends.
//!
//! The contract mirrors the browser storage API: string keys, string values,
//! a missing key reads as `None`. Backends surface I/O problems as
//! [`StoreError`]s; callers in the runtime treat them as best-effort.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use store_core::error::{Result, StoreError};

// ── DurableStorage ────────────────────────────────────────────────────────────

/// String key/value storage that outlives the in-memory store.
pub trait DurableStorage: Send + Sync {
    /// Read the value under `key`, `Ok(None)` when absent.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<()>;
}

// ── MemoryStorage ─────────────────────────────────────────────────────────────

/// Process-local storage, used in tests and when no data directory exists.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items().remove(key);
        Ok(())
    }
}

// ── FileStorage ───────────────────────────────────────────────────────────────

/// One file per key inside a directory.
///
/// Writes go to a temp file that is then renamed over the target, so a
/// crashed write never leaves a truncated value behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a backend rooted at `dir`. The directory is created lazily on
    /// the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.item", encode_key(key)))
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::StorageRead {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let write_err = |source| StoreError::StorageWrite {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;

        let path = self.path_for(key);
        let tmp = path.with_extension("item.tmp");
        std::fs::write(&tmp, value).map_err(write_err)?;
        std::fs::rename(&tmp, &path).map_err(write_err)?;

        tracing::trace!(key, path = %path.display(), "storage item written");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::StorageWrite {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Keep ASCII alphanumerics, `-`, `_` and `.`; every other byte becomes
/// `%XX`, so distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── MemoryStorage ─────────────────────────────────────────────────────────

    #[test]
    fn test_memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set_item("authToken", "abc").unwrap();
        assert_eq!(storage.get_item("authToken").unwrap().as_deref(), Some("abc"));
        assert_eq!(storage.len(), 1);

        storage.set_item("authToken", "def").unwrap();
        assert_eq!(storage.get_item("authToken").unwrap().as_deref(), Some("def"));

        storage.remove_item("authToken").unwrap();
        assert!(storage.get_item("authToken").unwrap().is_none());
    }

    #[test]
    fn test_memory_storage_remove_missing_is_ok() {
        let storage = MemoryStorage::new();
        assert!(storage.remove_item("nothing").is_ok());
    }

    // ── FileStorage ───────────────────────────────────────────────────────────

    #[test]
    fn test_file_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.set_item("session-storage", r#"{"state":{}}"#).unwrap();
        assert_eq!(
            storage.get_item("session-storage").unwrap().as_deref(),
            Some(r#"{"state":{}}"#)
        );
        assert!(storage.path_for("session-storage").exists());
    }

    #[test]
    fn test_file_storage_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.get_item("absent").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_creates_directory_lazily() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(&nested);
        assert!(!nested.exists());

        storage.set_item("k", "v").unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_file_storage_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        FileStorage::new(dir.path()).set_item("authToken", "tok").unwrap();

        let reopened = FileStorage::new(dir.path());
        assert_eq!(reopened.get_item("authToken").unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn test_file_storage_remove() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set_item("authToken", "tok").unwrap();

        storage.remove_item("authToken").unwrap();
        assert!(storage.get_item("authToken").unwrap().is_none());
        // Second removal is a no-op.
        storage.remove_item("authToken").unwrap();
    }

    #[test]
    fn test_file_storage_no_temp_file_left() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set_item("k", "v").unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_file_storage_write_into_file_path_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        // The storage directory is a regular file, so no write can succeed.
        let storage = FileStorage::new(&blocker);
        let err = storage.set_item("k", "v").unwrap_err();
        assert!(err.to_string().contains("Failed to write storage key k"));
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("session-storage"), "session-storage");
        assert_eq!(encode_key("../etc/passwd"), "..%2Fetc%2Fpasswd");
        assert_eq!(encode_key("a b:c"), "a%20b%3Ac");
        assert_eq!(encode_key("100%"), "100%25");
        assert_eq!(encode_key("é"), "%C3%A9");
    }

    #[test]
    fn test_similar_keys_use_distinct_files() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_ne!(storage.path_for("a/b"), storage.path_for("a_b"));
        assert_ne!(storage.path_for("a%2Fb"), storage.path_for("a/b"));

        storage.set_item("a/b", "slash").unwrap();
        storage.set_item("a_b", "underscore").unwrap();
        assert_eq!(storage.get_item("a/b").unwrap().as_deref(), Some("slash"));
        assert_eq!(storage.get_item("a_b").unwrap().as_deref(), Some("underscore"));

        storage.remove_item("a/b").unwrap();
        assert!(storage.get_item("a/b").unwrap().is_none());
        assert_eq!(storage.get_item("a_b").unwrap().as_deref(), Some("underscore"));
    }
}
