//! Durable local key-value storage.
//!
//! The session identity store persists `chatflow-session-{conversation_id}`
//! keys here, and the backend access token is read from the `access-token`
//! key (written by the host application, read-only from this crate's view).
//!
//! [`FsKvStore`] keeps all keys in a single JSON file with atomic writes
//! (temp file + rename) to prevent corruption on crash. [`MemoryKvStore`]
//! backs tests and environments without durable storage: values survive for
//! the process lifetime only, which is exactly the degraded behavior the
//! session identity contract allows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::FlowChatError;

/// Key under which the host application stores the backend access token.
pub const ACCESS_TOKEN_KEY: &str = "access-token";

/// Async key-value storage backend.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value. `Ok(None)` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, FlowChatError>;

    /// Write a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), FlowChatError>;

    /// Remove a key. `Ok(())` even if the key did not exist.
    async fn remove(&self, key: &str) -> Result<(), FlowChatError>;
}

/// In-memory key-value store for tests and ephemeral usage.
///
/// Thread-safe and cheaply cloneable; contents are lost on drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FlowChatError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), FlowChatError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), FlowChatError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

/// Filesystem-backed key-value store.
///
/// All entries live in `{data_dir}/store.json`. Writes are atomic
/// (temp file + rename) so a crash mid-write never corrupts the store.
#[derive(Debug, Clone)]
pub struct FsKvStore {
    file_path: PathBuf,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl FsKvStore {
    /// Create a store rooted at the given data directory.
    ///
    /// Creates the directory if it does not exist and loads any existing
    /// entries. An unreadable or unparseable file starts the store empty
    /// rather than failing: losing persisted session ids degrades to fresh
    /// sessions, which the identity contract permits.
    ///
    /// # Errors
    ///
    /// Returns [`FlowChatError::StorageError`] if the directory cannot be
    /// created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, FlowChatError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            FlowChatError::StorageError(format!(
                "failed to create data directory {}: {e}",
                data_dir.display()
            ))
        })?;
        let file_path = data_dir.join("store.json");
        let entries = Self::load_entries(&file_path);
        Ok(Self {
            file_path,
            cache: Arc::new(RwLock::new(entries)),
        })
    }

    /// Create a store under the platform data directory
    /// (`{data_dir}/flowchat`).
    ///
    /// # Errors
    ///
    /// Returns [`FlowChatError::StorageError`] if no platform data directory
    /// is available or it cannot be created.
    pub fn default_location() -> Result<Self, FlowChatError> {
        let base = dirs::data_dir().ok_or_else(|| {
            FlowChatError::StorageError("no platform data directory available".into())
        })?;
        Self::new(base.join("flowchat"))
    }

    /// Path of the backing JSON file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn load_entries(path: &Path) -> HashMap<String, String> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    /// Atomically persist the current entries to disk.
    fn write_atomic(&self, entries: &HashMap<String, String>) -> Result<(), FlowChatError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| FlowChatError::StorageError(format!("failed to serialize store: {e}")))?;

        let tmp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| {
            FlowChatError::StorageError(format!(
                "failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;

        if let Ok(file) = std::fs::File::open(&tmp_path) {
            let _ = file.sync_all();
        }

        std::fs::rename(&tmp_path, &self.file_path).map_err(|e| {
            FlowChatError::StorageError(format!(
                "failed to rename temp file to {}: {e}",
                self.file_path.display()
            ))
        })
    }
}

#[async_trait]
impl KvStore for FsKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FlowChatError> {
        let cache = self.cache.read().await;
        Ok(cache.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), FlowChatError> {
        let mut cache = self.cache.write().await;
        cache.insert(key.to_owned(), value.to_owned());
        self.write_atomic(&cache)
    }

    async fn remove(&self, key: &str) -> Result<(), FlowChatError> {
        let mut cache = self.cache.write().await;
        if cache.remove(key).is_some() {
            self.write_atomic(&cache)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── MemoryKvStore ─────────────────────────────────────────

    #[tokio::test]
    async fn memory_get_absent_key() {
        let store = MemoryKvStore::new();
        let value = store.get("missing").await;
        assert!(matches!(value, Ok(None)));
    }

    #[tokio::test]
    async fn memory_set_then_get() {
        let store = MemoryKvStore::new();
        let set = store.set("chatflow-session-flow1", "sess_abc").await;
        assert!(set.is_ok());

        let value = store.get("chatflow-session-flow1").await;
        assert!(matches!(value, Ok(Some(v)) if v == "sess_abc"));
    }

    #[tokio::test]
    async fn memory_set_overwrites() {
        let store = MemoryKvStore::new();
        let _ = store.set("k", "first").await;
        let _ = store.set("k", "second").await;
        let value = store.get("k").await;
        assert!(matches!(value, Ok(Some(v)) if v == "second"));
    }

    #[tokio::test]
    async fn memory_remove() {
        let store = MemoryKvStore::new();
        let _ = store.set("k", "v").await;
        let removed = store.remove("k").await;
        assert!(removed.is_ok());
        let value = store.get("k").await;
        assert!(matches!(value, Ok(None)));
    }

    #[tokio::test]
    async fn memory_remove_absent_is_ok() {
        let store = MemoryKvStore::new();
        let removed = store.remove("never-set").await;
        assert!(removed.is_ok());
    }

    #[test]
    fn memory_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryKvStore>();
    }

    // ── FsKvStore ─────────────────────────────────────────────

    #[tokio::test]
    async fn fs_set_then_get() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => unreachable!("tempdir created"),
        };
        let store = FsKvStore::new(dir.path());
        assert!(store.is_ok());
        let store = match store {
            Ok(s) => s,
            Err(_) => unreachable!("store created"),
        };

        let set = store.set("access-token", "tok_123").await;
        assert!(set.is_ok());
        let value = store.get("access-token").await;
        assert!(matches!(value, Ok(Some(v)) if v == "tok_123"));
    }

    #[tokio::test]
    async fn fs_persists_across_reopen() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => unreachable!("tempdir created"),
        };

        {
            let store = match FsKvStore::new(dir.path()) {
                Ok(s) => s,
                Err(_) => unreachable!("store created"),
            };
            let set = store.set("chatflow-session-f1", "sess_persisted").await;
            assert!(set.is_ok());
        }

        let reopened = match FsKvStore::new(dir.path()) {
            Ok(s) => s,
            Err(_) => unreachable!("store reopened"),
        };
        let value = reopened.get("chatflow-session-f1").await;
        assert!(matches!(value, Ok(Some(v)) if v == "sess_persisted"));
    }

    #[tokio::test]
    async fn fs_remove_persists() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => unreachable!("tempdir created"),
        };
        let store = match FsKvStore::new(dir.path()) {
            Ok(s) => s,
            Err(_) => unreachable!("store created"),
        };
        let _ = store.set("k", "v").await;
        let removed = store.remove("k").await;
        assert!(removed.is_ok());

        let reopened = match FsKvStore::new(dir.path()) {
            Ok(s) => s,
            Err(_) => unreachable!("store reopened"),
        };
        let value = reopened.get("k").await;
        assert!(matches!(value, Ok(None)));
    }

    #[tokio::test]
    async fn fs_corrupt_file_starts_empty() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => unreachable!("tempdir created"),
        };
        let write = std::fs::write(dir.path().join("store.json"), "not json {");
        assert!(write.is_ok());

        let store = match FsKvStore::new(dir.path()) {
            Ok(s) => s,
            Err(_) => unreachable!("store created"),
        };
        let value = store.get("anything").await;
        assert!(matches!(value, Ok(None)));
    }

    #[test]
    fn kv_store_is_object_safe() {
        fn _takes_dyn_store(_store: &dyn KvStore) {}
        fn _takes_arc_store(_store: Arc<dyn KvStore>) {}
    }
}
