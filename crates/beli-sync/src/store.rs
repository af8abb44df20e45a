//! # Key-Value Stores
//!
//! Persistence boundary for the mutation queue. The queue writes one JSON
//! document under a fixed key on every change and reads it back on load.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KeyValueStore                                   │
//! │                                                                         │
//! │  MemoryStore   HashMap in process memory (tests, ephemeral sessions)   │
//! │  FileStore     <dir>/<key>.json, written via temp file + rename        │
//! │  Database      beli-db kv_store table (SQLite, WAL)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use beli_db::{Database, DbConfig};

use crate::config::{StorageBackend, StorageSettings};
use crate::error::{SyncError, SyncResult};

/// Async string-keyed document store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> SyncResult<()>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> SyncResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(?dir, "File store ready");
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a key to a file name, replacing anything outside `[A-Za-z0-9._-]`.
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

// =============================================================================
// SQLite Store
// =============================================================================

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.kv().get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        Ok(self.kv().set(key, value).await?)
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Opens the store the settings describe.
pub async fn open_store(settings: &StorageSettings) -> SyncResult<Arc<dyn KeyValueStore>> {
    match settings.backend {
        StorageBackend::Memory => {
            info!("Using in-memory queue storage");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::File => {
            let dir = settings
                .resolved_path()
                .ok_or_else(|| SyncError::InvalidConfig("No storage directory available".into()))?;
            info!(?dir, "Using file queue storage");
            Ok(Arc::new(FileStore::open(dir).await?))
        }
        StorageBackend::Sqlite => {
            let path = settings
                .resolved_path()
                .ok_or_else(|| SyncError::InvalidConfig("No database path available".into()))?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            info!(?path, "Using SQLite queue storage");
            Ok(Arc::new(Database::new(DbConfig::new(path)).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "1").await.unwrap();
        store.set("k", "2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("beli-sync-store").await.unwrap(), None);
        store.set("beli-sync-store", r#"{"pendingMutations":[]}"#).await.unwrap();

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("beli-sync-store").await.unwrap().as_deref(),
            Some(r#"{"pendingMutations":[]}"#)
        );
        assert!(dir.path().join("beli-sync-store.json").exists());
        assert!(!dir.path().join("beli-sync-store.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.set("../escape/key", "v").await.unwrap();
        assert!(dir.path().join(".._escape_key.json").exists());
        assert_eq!(store.get("../escape/key").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_sqlite_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: &dyn KeyValueStore = &db;

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_open_store_backends() {
        let dir = tempfile::tempdir().unwrap();

        for backend in [StorageBackend::Memory, StorageBackend::File, StorageBackend::Sqlite] {
            let settings = StorageSettings {
                backend,
                path: Some(dir.path().join(backend.to_string())),
            };
            let store = open_store(&settings).await.unwrap();
            store.set("k", "v").await.unwrap();
            assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        }
    }
}
