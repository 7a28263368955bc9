use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::entry::{now_millis, CacheEntry, QueueEntry};
use super::traits::{CacheStore, QueueStore, StorageError};

/// In-memory queue store. Nothing survives a restart; used by tests and
/// profiles that opt out of durability.
pub struct MemoryQueueStore {
    entries: RwLock<Vec<QueueEntry>>,
}

impl MemoryQueueStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(&self, entry: &QueueEntry) -> Result<(), StorageError> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<QueueEntry>, StorageError> {
        Ok(self.entries.read().clone())
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        self.entries.write().retain(|e| e.id != id);
        Ok(())
    }

    async fn replace_all(&self, entries: &[QueueEntry]) -> Result<(), StorageError> {
        *self.entries.write() = entries.to_vec();
        Ok(())
    }

    async fn len(&self) -> Result<u64, StorageError> {
        Ok(self.entries.read().len() as u64)
    }
}

/// In-memory cache store keyed by path.
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Current entry count, fresh and stale alike.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn put(&self, path: &str, data: &Value, ttl_ms: i64) -> Result<(), StorageError> {
        let now = now_millis();
        self.entries.insert(
            path.to_string(),
            CacheEntry {
                path: path.to_string(),
                data: data.clone(),
                expires_at: now + ttl_ms,
                cached_at: now,
            },
        );
        Ok(())
    }

    async fn get_fresh(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let now = now_millis();
        Ok(self
            .entries
            .get(path)
            .filter(|e| e.is_fresh(now))
            .map(|e| e.data.clone()))
    }

    async fn get_stale(&self, path: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(path).map(|e| e.data.clone()))
    }

    async fn evict(&self, path: &str) -> Result<(), StorageError> {
        self.entries.remove(path);
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<u64, StorageError> {
        let now = now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_fresh(now));
        Ok((before - self.entries.len()) as u64)
    }
}
