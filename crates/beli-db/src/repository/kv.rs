//! # Key-Value Repository
//!
//! Whole-document storage keyed by a fixed namespace string. The mutation
//! queue writes its entire persisted snapshot under one key on every change.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           kv_store Table                                │
//! │                                                                         │
//! │  key               │ value                          │ updated_at        │
//! │  ──────────────────┼────────────────────────────────┼─────────────────  │
//! │  beli-sync-store   │ {"pendingMutations":[...],...} │ 2026-10-18T...    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for key-value documents.
#[derive(Debug, Clone)]
pub struct KvRepository {
    pool: SqlitePool,
}

impl KvRepository {
    /// Creates a new KvRepository.
    pub fn new(pool: SqlitePool) -> Self {
        KvRepository { pool }
    }

    /// Reads the value stored under `key`.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Inserts or replaces the value stored under `key`.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, bytes = value.len(), "Writing kv document");

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_get_missing_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.kv().get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let kv = db.kv();

        kv.set("beli-sync-store", r#"{"a":1}"#).await.unwrap();
        kv.set("beli-sync-store", r#"{"a":2}"#).await.unwrap();

        assert_eq!(kv.get("beli-sync-store").await.unwrap().as_deref(), Some(r#"{"a":2}"#));
        assert_eq!(kv.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.db");

        {
            let db = Database::new(DbConfig::new(&path)).await.unwrap();
            db.kv().set("k", "persisted").await.unwrap();
            db.close().await;
        }

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(db.kv().get("k").await.unwrap().as_deref(), Some("persisted"));
    }
}
