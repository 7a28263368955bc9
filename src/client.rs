//! Public facade: the entry point application code uses.
//!
//! [`SyncClient`] composes the remote client, the cache and the durable
//! queue into one read/write API with offline fallback:
//!
//! - writes try the remote first; an [`SyncError::Offline`] failure is
//!   converted into a [`SaveOutcome::Queued`] result instead of an error,
//!   so callers can show "saved locally, will sync";
//! - reads serve a fresh cache hit without touching the network, and fall
//!   back to a stale cache entry when the remote is unreachable;
//! - `Unauthenticated`, `RemoteRejected` and `InvalidInput` always
//!   propagate untouched — retrying an actively rejected request would
//!   never succeed.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::auth::TokenProvider;
use crate::config::SyncConfig;
use crate::entry::{Method, Operation, QueueEntry};
use crate::error::SyncError;
use crate::remote::RemoteStore;
use crate::storage::traits::{CacheStore, QueueStore};

/// How a write resolved.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// The remote accepted the write; carries the remote's response.
    Saved(Value),
    /// The device is offline; the write is persisted locally and will be
    /// replayed by the sync engine.
    Queued(QueueEntry),
}

impl SaveOutcome {
    /// Whether the write was deferred rather than delivered.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

pub struct SyncClient {
    remote: Arc<dyn RemoteStore>,
    queue: Arc<dyn QueueStore>,
    cache: Arc<dyn CacheStore>,
    auth: Arc<dyn TokenProvider>,
    config: SyncConfig,
}

impl SyncClient {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        queue: Arc<dyn QueueStore>,
        cache: Arc<dyn CacheStore>,
        auth: Arc<dyn TokenProvider>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            queue,
            cache,
            auth,
            config,
        }
    }

    /// Write an entity to `path`. Offline converts to a queued outcome.
    pub async fn save_entity(&self, path: &str, entity: &Value) -> Result<SaveOutcome, SyncError> {
        if self.auth.current_user().is_none() {
            return Err(SyncError::Unauthenticated);
        }

        match self
            .remote
            .request(Method::Put, path, Some(entity), &HashMap::new())
            .await
        {
            Ok(response) => {
                self.cache_put(path, entity, self.config.default_cache_ttl_ms).await;
                Ok(SaveOutcome::Saved(response))
            }
            Err(SyncError::Offline) => {
                self.queue_write(Operation::Put, path, Some(entity.clone()), HashMap::new())
                    .await
            }
            Err(other) => Err(other),
        }
    }

    /// Read the entity at `path`: fresh cache, then remote, then stale cache.
    pub async fn get_entity(&self, path: &str) -> Result<Value, SyncError> {
        if let Some(cached) = self.cache.get_fresh(path).await? {
            debug!(path, "Serving fresh cache hit");
            return Ok(cached);
        }

        match self
            .remote
            .request(Method::Get, path, None, &HashMap::new())
            .await
        {
            Ok(value) => {
                self.cache_put(path, &value, self.config.default_cache_ttl_ms).await;
                Ok(value)
            }
            Err(e) => self.stale_fallback(path, e).await,
        }
    }

    /// List entities under `scope`, forwarding `filters` as query params.
    /// Listings change often, so they cache under the shorter listing TTL.
    pub async fn list_entities(
        &self,
        scope: &str,
        filters: &HashMap<String, String>,
    ) -> Result<Value, SyncError> {
        let path = format!("{}/", scope.trim_end_matches('/'));
        let cache_path = listing_cache_path(&path, filters);

        if let Some(cached) = self.cache.get_fresh(&cache_path).await? {
            debug!(scope, "Serving fresh listing from cache");
            return Ok(cached);
        }

        let mut params = filters.clone();
        params.insert("list".to_string(), "true".to_string());

        match self.remote.request(Method::Get, &path, None, &params).await {
            Ok(value) => {
                self.cache_put(&cache_path, &value, self.config.listing_cache_ttl_ms).await;
                Ok(value)
            }
            Err(e) => self.stale_fallback(&cache_path, e).await,
        }
    }

    /// Delete the entity at `path`. Offline converts to a queued outcome;
    /// a delivered delete also evicts the cache entry.
    pub async fn delete_entity(&self, path: &str) -> Result<SaveOutcome, SyncError> {
        if self.auth.current_user().is_none() {
            return Err(SyncError::Unauthenticated);
        }

        match self
            .remote
            .request(Method::Delete, path, None, &HashMap::new())
            .await
        {
            Ok(response) => {
                if let Err(e) = self.cache.evict(path).await {
                    error!(path, error = %e, "Failed to evict cache entry after delete");
                }
                Ok(SaveOutcome::Saved(response))
            }
            Err(SyncError::Offline) => {
                self.queue_write(Operation::Delete, path, None, HashMap::new())
                    .await
            }
            Err(other) => Err(other),
        }
    }

    async fn queue_write(
        &self,
        operation: Operation,
        path: &str,
        payload: Option<Value>,
        query_params: HashMap<String, String>,
    ) -> Result<SaveOutcome, SyncError> {
        let entry = QueueEntry::new(operation, path.to_string(), payload, query_params);

        // A persistence failure must not turn the optimistic outcome into a
        // hard error; the entry just may not survive a restart
        if let Err(e) = self.queue.enqueue(&entry).await {
            error!(id = %entry.id, path, error = %e, "Failed to persist queued write");
        } else {
            info!(id = %entry.id, path, op = %entry.operation, "Offline, write queued for sync");
        }

        Ok(SaveOutcome::Queued(entry))
    }

    async fn stale_fallback(&self, cache_path: &str, cause: SyncError) -> Result<Value, SyncError> {
        match self.cache.get_stale(cache_path).await? {
            Some(stale) => {
                debug!(path = cache_path, cause = %cause, "Remote read failed, serving stale cache");
                Ok(stale)
            }
            None => Err(cause),
        }
    }

    async fn cache_put(&self, path: &str, value: &Value, ttl_ms: i64) {
        // Cache writes are best-effort; a failed memoization is not an error
        if let Err(e) = self.cache.put(path, value, ttl_ms).await {
            error!(path, error = %e, "Failed to cache value");
        }
    }
}

/// Listing cache key: scope path plus the filter set canonicalized by
/// sorted key, so differently-filtered listings don't overwrite each other.
fn listing_cache_path(path: &str, filters: &HashMap<String, String>) -> String {
    if filters.is_empty() {
        return path.to_string();
    }
    let mut pairs: Vec<_> = filters.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", path, query.join("&"))
}
