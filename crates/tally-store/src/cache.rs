//! TTL'd key/value cache on top of the same SQLite database.
//!
//! Holds pending confirmations and rolling conversation history — state
//! that must survive a restart but expire on its own. Expiry is lazy:
//! a read past the deadline deletes the row and reports a miss.

use chrono::Utc;
use sqlx::SqlitePool;
use tally_core::error::TallyError;

/// SQLite-backed KV cache with per-key TTLs.
#[derive(Clone)]
pub struct Cache {
    pool: SqlitePool,
}

impl Cache {
    /// Wrap an existing pool. The `kv_cache` table is created by the
    /// store's migrations, so the pool must come from an opened `Store`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Set a key, replacing any existing value and deadline.
    pub async fn set(&self, key: &str, value: &str, ttl_secs: i64) -> Result<(), TallyError> {
        let expires_at = Utc::now().timestamp() + ttl_secs;
        sqlx::query(
            "INSERT INTO kv_cache (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| TallyError::Cache(format!("failed to set {key}: {e}")))?;
        Ok(())
    }

    /// Get a live value. Expired rows are deleted and read as a miss.
    pub async fn get(&self, key: &str) -> Result<Option<String>, TallyError> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, expires_at FROM kv_cache WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| TallyError::Cache(format!("failed to get {key}: {e}")))?;

        match row {
            Some((value, expires_at)) if expires_at > Utc::now().timestamp() => Ok(Some(value)),
            Some(_) => {
                self.delete(key).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// True if a live value exists, without reading the payload.
    pub async fn exists(&self, key: &str) -> Result<bool, TallyError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM kv_cache WHERE key = ? AND expires_at > ?")
                .bind(key)
                .bind(Utc::now().timestamp())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| TallyError::Cache(format!("failed to check {key}: {e}")))?;
        Ok(row.is_some())
    }

    /// Remove a key. Missing keys are fine.
    pub async fn delete(&self, key: &str) -> Result<(), TallyError> {
        sqlx::query("DELETE FROM kv_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| TallyError::Cache(format!("failed to delete {key}: {e}")))?;
        Ok(())
    }

    /// Sweep all expired rows. Called periodically from the scheduler.
    pub async fn purge_expired(&self) -> Result<u64, TallyError> {
        let result = sqlx::query("DELETE FROM kv_cache WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| TallyError::Cache(format!("failed to purge cache: {e}")))?;
        Ok(result.rows_affected())
    }
}
