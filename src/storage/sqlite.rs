// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQLite storage backend for the durable queue and the read cache.
//!
//! One database file holds both tables:
//! ```sql
//! CREATE TABLE pending_ops (
//!   id TEXT PRIMARY KEY,     -- entry id (timestamp + random suffix)
//!   seq INTEGER NOT NULL,    -- explicit FIFO position
//!   operation TEXT NOT NULL, -- 'PUT' | 'DELETE'
//!   target_path TEXT NOT NULL,
//!   payload TEXT,            -- JSON, NULL for DELETE
//!   query_params TEXT NOT NULL,
//!   enqueued_at INTEGER NOT NULL,
//!   retry_count INTEGER NOT NULL
//! )
//! CREATE TABLE cache_entries (
//!   path TEXT PRIMARY KEY,
//!   data TEXT NOT NULL,      -- JSON
//!   cached_at INTEGER NOT NULL,
//!   expires_at INTEGER NOT NULL
//! )
//! ```
//!
//! The `seq` column exists so `replace_all` can write back an arbitrary
//! order exactly; insertion order and id order coincide in practice but the
//! queue contract is positional, not lexical.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::entry::{now_millis, Operation, QueueEntry};
use super::traits::{CacheStore, QueueStore, StorageError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and initialize the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let url = format!("sqlite://{}?mode=rwc", path_str);

        info!(path = %path_str, "Opening local sync database");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let store = Self { pool };
        store.enable_wal_mode().await?;
        store.init_schema().await?;

        // Entries left over from a previous session drain on the first pass
        let pending = QueueStore::len(&store).await.unwrap_or(0);
        if pending > 0 {
            warn!(pending, "Queue has entries from previous session, will drain");
        }

        Ok(store)
    }

    /// Enable WAL journaling: readers don't block the writer, and writes hit
    /// a single fsync.
    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        // NORMAL is safe under WAL and considerably faster than FULL
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_ops (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                operation TEXT NOT NULL,
                target_path TEXT NOT NULL,
                payload TEXT,
                query_params TEXT NOT NULL DEFAULT '{}',
                enqueued_at INTEGER NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                path TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    fn row_to_entry(row: &SqliteRow) -> Result<QueueEntry, StorageError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let op_str: String = row
            .try_get("operation")
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let operation = Operation::parse(&op_str)
            .ok_or_else(|| StorageError::Backend(format!("Unknown operation '{}' for '{}'", op_str, id)))?;
        let target_path: String = row
            .try_get("target_path")
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let payload: Option<Value> = match row.try_get::<Option<String>, _>("payload") {
            Ok(Some(text)) => Some(
                serde_json::from_str(&text)
                    .map_err(|e| StorageError::Backend(format!("Corrupt payload for '{}': {}", id, e)))?,
            ),
            Ok(None) => None,
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };

        let params_text: String = row.try_get("query_params").unwrap_or_else(|_| "{}".to_string());
        let query_params: HashMap<String, String> =
            serde_json::from_str(&params_text).unwrap_or_default();

        let enqueued_at: i64 = row.try_get("enqueued_at").unwrap_or(0);
        let retry_count: i64 = row.try_get("retry_count").unwrap_or(0);

        Ok(QueueEntry {
            id,
            operation,
            target_path,
            payload,
            query_params,
            enqueued_at,
            retry_count: retry_count as u32,
        })
    }

    fn payload_text(entry: &QueueEntry) -> Result<Option<String>, StorageError> {
        entry
            .payload
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| StorageError::Backend(format!("Unserializable payload: {}", e)))
    }

    fn params_text(entry: &QueueEntry) -> Result<String, StorageError> {
        serde_json::to_string(&entry.query_params)
            .map_err(|e| StorageError::Backend(format!("Unserializable params: {}", e)))
    }
}

#[async_trait]
impl QueueStore for SqliteStore {
    async fn enqueue(&self, entry: &QueueEntry) -> Result<(), StorageError> {
        let payload = Self::payload_text(entry)?;
        let params = Self::params_text(entry)?;

        // seq is assigned inside the statement so concurrent enqueues can't
        // pick the same position
        sqlx::query(
            "INSERT INTO pending_ops (id, seq, operation, target_path, payload, query_params, enqueued_at, retry_count)
             VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM pending_ops), ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(entry.operation.as_str())
        .bind(&entry.target_path)
        .bind(&payload)
        .bind(&params)
        .bind(entry.enqueued_at)
        .bind(entry.retry_count as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        debug!(id = %entry.id, path = %entry.target_path, op = %entry.operation, "Entry enqueued");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<QueueEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, operation, target_path, payload, query_params, enqueued_at, retry_count
             FROM pending_ops ORDER BY seq ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(Self::row_to_entry(row)?);
        }
        Ok(entries)
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM pending_ops WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn replace_all(&self, entries: &[QueueEntry]) -> Result<(), StorageError> {
        // Clear-then-insert inside one transaction: a crash mid-write cannot
        // leave a partially-written queue
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        sqlx::query("DELETE FROM pending_ops")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        for (i, entry) in entries.iter().enumerate() {
            let payload = Self::payload_text(entry)?;
            let params = Self::params_text(entry)?;

            sqlx::query(
                "INSERT INTO pending_ops (id, seq, operation, target_path, payload, query_params, enqueued_at, retry_count)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.id)
            .bind((i + 1) as i64)
            .bind(entry.operation.as_str())
            .bind(&entry.target_path)
            .bind(&payload)
            .bind(&params)
            .bind(entry.enqueued_at)
            .bind(entry.retry_count as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        debug!(count = entries.len(), "Queue rewritten");
        Ok(())
    }

    async fn len(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM pending_ops")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn put(&self, path: &str, data: &Value, ttl_ms: i64) -> Result<(), StorageError> {
        let now = now_millis();
        let text = serde_json::to_string(data)
            .map_err(|e| StorageError::Backend(format!("Unserializable cache value: {}", e)))?;

        sqlx::query(
            "INSERT INTO cache_entries (path, data, cached_at, expires_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
                data = excluded.data,
                cached_at = excluded.cached_at,
                expires_at = excluded.expires_at",
        )
        .bind(path)
        .bind(&text)
        .bind(now)
        .bind(now + ttl_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get_fresh(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query("SELECT data FROM cache_entries WHERE path = ? AND expires_at > ?")
            .bind(path)
            .bind(now_millis())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        parse_cached(row, path)
    }

    async fn get_stale(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query("SELECT data FROM cache_entries WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        parse_cached(row, path)
    }

    async fn evict(&self, path: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM cache_entries WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
        Ok(removed)
    }
}

fn parse_cached(row: Option<SqliteRow>, path: &str) -> Result<Option<Value>, StorageError> {
    match row {
        Some(row) => {
            let text: String = row
                .try_get("data")
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let value = serde_json::from_str(&text)
                .map_err(|e| StorageError::Backend(format!("Corrupt cache entry '{}': {}", path, e)))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
