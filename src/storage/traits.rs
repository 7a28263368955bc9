use async_trait::async_trait;
use serde_json::Value;

use crate::entry::QueueEntry;
pub use crate::error::StorageError;

/// Persistent, FIFO-ordered store of pending mutations.
///
/// The queue is exclusively owned by the client instance for the current
/// device/profile; no cross-tab coordination is guaranteed.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a new entry at the tail of the queue.
    async fn enqueue(&self, entry: &QueueEntry) -> Result<(), StorageError>;

    /// All pending entries in insertion (FIFO) order. Re-reading always
    /// returns the current persisted order.
    async fn list_all(&self) -> Result<Vec<QueueEntry>, StorageError>;

    /// Remove one entry by id. Idempotent: removing a non-existent id is a
    /// no-op, not an error.
    async fn remove(&self, id: &str) -> Result<(), StorageError>;

    /// Replace the whole queue with `entries`, preserving their order, as a
    /// single logical unit. Used to persist retry-count increments after a
    /// drain pass.
    async fn replace_all(&self, entries: &[QueueEntry]) -> Result<(), StorageError>;

    /// Number of pending entries.
    async fn len(&self) -> Result<u64, StorageError>;
}

/// TTL-bounded memoization of reads, plus last-resort fallback data.
///
/// At most one entry per path; writing a path overwrites the previous entry
/// entirely.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Overwrite the entry for `path`; it expires `ttl_ms` from now.
    async fn put(&self, path: &str, data: &Value, ttl_ms: i64) -> Result<(), StorageError>;

    /// The value for `path` only if it has not expired. Does not delete a
    /// stale entry.
    async fn get_fresh(&self, path: &str) -> Result<Option<Value>, StorageError>;

    /// The value for `path` regardless of expiry. Used only as a fallback
    /// when the remote call and `get_fresh` both fail.
    async fn get_stale(&self, path: &str) -> Result<Option<Value>, StorageError>;

    /// Delete the entry for `path`, if any.
    async fn evict(&self, path: &str) -> Result<(), StorageError>;

    /// Delete all expired entries. Returns how many were removed. Safe to
    /// run concurrently with reads and writes.
    async fn sweep_expired(&self) -> Result<u64, StorageError>;
}
