// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync engine: replays the durable queue against the remote store.
//!
//! # Lifecycle
//!
//! ```text
//! Idle → Draining → Idle
//! ```
//!
//! A drain is triggered by (a) the periodic timer, (b) an offline→online
//! transition, (c) a [`SyncHandle::request_sync`] message from a secondary
//! execution context, or (d) a direct [`SyncEngine::drain`] call. A
//! single-flight guard keeps overlapping triggers from running two drains
//! concurrently within one engine instance — it is not a lock across
//! processes sharing the same store.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldsync::{SyncEngine, SyncConfig, MemoryQueueStore, MemoryCacheStore};
//! use fieldsync::remote::HttpRemote;
//! use fieldsync::auth::StaticTokenProvider;
//! use tokio::sync::watch;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = SyncConfig { base_url: "https://kv.example.com".into(), ..Default::default() };
//! let auth = Arc::new(StaticTokenProvider::new("user-1", "token"));
//! let remote = Arc::new(HttpRemote::new(&config, auth).unwrap());
//! let (online_tx, online_rx) = watch::channel(true);
//!
//! let engine = Arc::new(SyncEngine::new(
//!     Arc::new(MemoryQueueStore::new()),
//!     Arc::new(MemoryCacheStore::new()),
//!     remote,
//!     config,
//!     online_rx,
//! ));
//!
//! let _events = engine.subscribe();
//! tokio::spawn({ let engine = engine.clone(); async move { engine.run().await } });
//!
//! // The network layer flips this on connectivity changes:
//! online_tx.send(false).ok();
//! # }
//! ```

mod types;
mod drain;
mod run;

pub use types::{DrainReport, SyncEvent, SyncHandle, SyncOutcome, SyncRequest, SyncStatus};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, Mutex};

use crate::config::SyncConfig;
use crate::entry::QueueEntry;
use crate::remote::RemoteStore;
use crate::storage::traits::{CacheStore, QueueStore, StorageError};

/// Size of the event fan-out buffer; slow subscribers lag rather than block.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct SyncEngine {
    pub(super) queue: Arc<dyn QueueStore>,
    pub(super) cache: Arc<dyn CacheStore>,
    pub(super) remote: Arc<dyn RemoteStore>,
    pub(super) config: SyncConfig,

    /// Single-flight guard: true while a drain pass is running.
    pub(super) draining: AtomicBool,

    /// Connectivity signal owned by the network layer.
    pub(super) online_rx: watch::Receiver<bool>,

    /// Replay outcome fan-out.
    pub(super) events: broadcast::Sender<SyncEvent>,

    /// Secondary-context trigger channel. The receiver is owned by the run
    /// loop; senders are handed out via [`SyncHandle`].
    pub(super) trigger_tx: mpsc::UnboundedSender<SyncRequest>,
    pub(super) trigger_rx: Mutex<mpsc::UnboundedReceiver<SyncRequest>>,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        cache: Arc<dyn CacheStore>,
        remote: Arc<dyn RemoteStore>,
        config: SyncConfig,
        online_rx: watch::Receiver<bool>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();

        Self {
            queue,
            cache,
            remote,
            config,
            draining: AtomicBool::new(false),
            online_rx,
            events,
            trigger_tx,
            trigger_rx: Mutex::new(trigger_rx),
        }
    }

    /// Current connectivity as last reported by the network layer.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.online_rx.borrow()
    }

    /// Whether a drain pass is running right now.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Point-in-time status, recomputed from the queue and in-memory flags.
    pub async fn status(&self) -> Result<SyncStatus, StorageError> {
        Ok(SyncStatus {
            queue_length: self.queue.len().await?,
            is_syncing: self.is_syncing(),
            is_online: self.is_online(),
        })
    }

    /// Subscribe to replay outcome events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Handle for requesting a drain from outside the engine (service
    /// worker bridge, UI "sync now" button).
    #[must_use]
    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            tx: self.trigger_tx.clone(),
        }
    }

    pub(super) fn emit(&self, outcome: SyncOutcome, entry: QueueEntry) {
        // No subscribers is fine; events are fire-and-forget
        let _ = self.events.send(SyncEvent { outcome, entry });
    }
}
