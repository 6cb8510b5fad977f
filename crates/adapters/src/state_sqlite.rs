//! SQLite state store implementation

use async_trait::async_trait;
use courtside_domain::{StateError, StateStore};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;

/// SQLite-backed key/value state store with optional expiry
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Create a new SQLite state store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StateError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }

    fn now_unix() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM kv WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(Self::now_unix())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StateError> {
        let now = Self::now_unix();
        let expires_at = ttl
            .map(|ttl| i64::try_from(ttl.as_secs()).map(|secs| now.saturating_add(secs)))
            .transpose()
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        sqlx::query("DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StateError> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_value_roundtrip_and_upsert() {
        let store = SqliteStateStore::in_memory().await.unwrap();

        store.put("last-posted-id", "111", None).await.unwrap();
        store.put("last-posted-id", "222", None).await.unwrap();

        assert_eq!(
            store.get("last-posted-id").await.unwrap(),
            Some("222".to_string())
        );
        assert_eq!(store.get("poll-state").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStateStore::in_memory().await.unwrap();

        store.put("bsky-session", "{}", None).await.unwrap();
        store.delete("bsky-session").await.unwrap();
        store.delete("bsky-session").await.unwrap();

        assert_eq!(store.get("bsky-session").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_rows_read_as_absent() {
        let store = SqliteStateStore::in_memory().await.unwrap();

        store
            .put("bsky-session", "stale", Some(Duration::ZERO))
            .await
            .unwrap();
        store
            .put("schedule-cache", "fresh", Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        assert_eq!(store.get("bsky-session").await.unwrap(), None);
        assert_eq!(
            store.get("schedule-cache").await.unwrap(),
            Some("fresh".to_string())
        );
    }

    #[tokio::test]
    async fn test_rewrite_without_ttl_clears_expiry() {
        let store = SqliteStateStore::in_memory().await.unwrap();

        store
            .put("poll-state", "old", Some(Duration::ZERO))
            .await
            .unwrap();
        store.put("poll-state", "new", None).await.unwrap();

        assert_eq!(
            store.get("poll-state").await.unwrap(),
            Some("new".to_string())
        );
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("state.db");

        {
            let store = SqliteStateStore::new(&db_path).await.unwrap();
            store.put("last-posted-id", "1868", None).await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteStateStore::new(&db_path).await.unwrap();
        assert_eq!(
            reopened.get("last-posted-id").await.unwrap(),
            Some("1868".to_string())
        );
    }
}
