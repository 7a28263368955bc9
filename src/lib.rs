//! # fieldsync
//!
//! A durable offline mutation queue and sync engine for applications that
//! write to a remote key-value HTTP API over unreliable connectivity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SyncClient (facade)                    │
//! │  • save/get/list/delete against the remote store           │
//! │  • offline writes become queued outcomes, not errors       │
//! │  • reads: fresh cache → remote → stale cache fallback      │
//! └─────────────────────────────────────────────────────────────┘
//!          │                 │                    │
//!          ▼                 ▼                    ▼
//! ┌────────────────┐ ┌────────────────┐ ┌────────────────────┐
//! │  RemoteStore   │ │   CacheStore   │ │     QueueStore     │
//! │  HTTP + bearer │ │  TTL-bounded   │ │  FIFO, persistent  │
//! │  token, typed  │ │  memoization,  │ │  across restarts   │
//! │  failures      │ │  stale reads   │ │  (SQLite)          │
//! └────────────────┘ └────────────────┘ └────────────────────┘
//!          ▲                                      │
//!          │              (FIFO replay)           │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SyncEngine                          │
//! │  • drains the queue when connectivity returns              │
//! │  • single-flight guard, retry ceiling, outcome events      │
//! │  • periodic timer + online transitions + explicit trigger  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldsync::{
//!     SyncClient, SyncConfig, SyncEngine, SqliteStore,
//!     auth::StaticTokenProvider, remote::HttpRemote,
//! };
//! use serde_json::json;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SyncConfig {
//!         base_url: "https://storage.example.com/api".into(),
//!         db_path: Some("./fieldsync.db".into()),
//!         ..Default::default()
//!     };
//!
//!     let auth = Arc::new(StaticTokenProvider::new("user-1", "token"));
//!     let remote = Arc::new(HttpRemote::new(&config, auth.clone()).expect("client"));
//!     let store = Arc::new(SqliteStore::open("./fieldsync.db").await.expect("store"));
//!     let (online_tx, online_rx) = watch::channel(true);
//!
//!     let client = SyncClient::new(
//!         remote.clone(), store.clone(), store.clone(), auth, config.clone(),
//!     );
//!     let engine = Arc::new(SyncEngine::new(
//!         store.clone(), store, remote, config, online_rx,
//!     ));
//!     tokio::spawn({ let engine = engine.clone(); async move { engine.run().await } });
//!
//!     // Works online or offline; offline writes queue and sync later
//!     let outcome = client
//!         .save_entity("audits/user-1/a42", &json!({"id": "a42", "score": 97}))
//!         .await
//!         .expect("save");
//!     println!("queued: {}", outcome.is_queued());
//!
//!     // The network layer flips this on connectivity changes
//!     online_tx.send(false).ok();
//! }
//! ```
//!
//! ## Delivery semantics
//!
//! At-least-once: a queued write is removed only after the remote accepts
//! it, so a crash between delivery and removal can replay it. Remote writes
//! are expected to be idempotent by path. There is no cross-tab lock; two
//! engine instances over one store can double-replay.
//!
//! ## Modules
//!
//! - [`client`]: the [`SyncClient`] facade
//! - [`engine`]: the [`SyncEngine`] drain loop and events
//! - [`remote`]: the [`remote::RemoteStore`] seam and HTTP implementation
//! - [`storage`]: durable queue + cache traits, SQLite and in-memory backends
//! - [`auth`]: token provider seam
//! - [`entry`]: queue/cache record types

pub mod auth;
pub mod client;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod remote;
pub mod storage;

pub use client::{SaveOutcome, SyncClient};
pub use config::SyncConfig;
pub use engine::{DrainReport, SyncEngine, SyncEvent, SyncHandle, SyncOutcome, SyncStatus};
pub use entry::{CacheEntry, Method, Operation, QueueEntry};
pub use error::{StorageError, SyncError};
pub use storage::{CacheStore, MemoryCacheStore, MemoryQueueStore, QueueStore, SqliteStore};
