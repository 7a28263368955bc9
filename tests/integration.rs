//! End-to-end tests for the offline queue and sync engine.
//!
//! These run entirely in-process: the remote store is a scripted fake with
//! a switchable online flag, and durability is exercised through SQLite in
//! a temp directory.
//!
//! # Test Organization
//! - `scenario_*` - the core offline/replay scenarios
//! - `durability_*` - queue survival across restarts

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};

use fieldsync::auth::StaticTokenProvider;
use fieldsync::remote::RemoteStore;
use fieldsync::{
    Method, Operation, SaveOutcome, SqliteStore, SyncClient, SyncConfig, SyncEngine, SyncError,
    SyncOutcome,
};

// =============================================================================
// Fake remote
// =============================================================================

/// In-process stand-in for the remote key-value endpoint.
///
/// Applies PUT/DELETE to an internal map so tests can assert the final
/// remote state; `online` and `reject_all` flip failure modes at runtime.
struct FakeRemote {
    online: AtomicBool,
    reject_all: AtomicBool,
    state: Mutex<HashMap<String, Value>>,
    calls: AtomicUsize,
}

impl FakeRemote {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            reject_all: AtomicBool::new(false),
            state: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn stored(&self, path: &str) -> Option<Value> {
        self.state.lock().await.get(path).cloned()
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn request(
        &self,
        method: Method,
        path: &str,
        data: Option<&Value>,
        _params: &HashMap<String, String>,
    ) -> Result<Value, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.online.load(Ordering::SeqCst) {
            return Err(SyncError::Offline);
        }
        if self.reject_all.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteRejected {
                status: 500,
                message: "remote unhappy".into(),
            });
        }

        let mut state = self.state.lock().await;
        match method {
            Method::Put => {
                let value = data.cloned().unwrap_or(Value::Null);
                state.insert(path.to_string(), value.clone());
                Ok(value)
            }
            Method::Delete => {
                state.remove(path);
                Ok(Value::Null)
            }
            Method::Get => state.get(path).cloned().ok_or(SyncError::RemoteRejected {
                status: 404,
                message: "not found".into(),
            }),
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    client: SyncClient,
    engine: Arc<SyncEngine>,
    remote: Arc<FakeRemote>,
    online_tx: watch::Sender<bool>,
    store: Arc<SqliteStore>,
}

/// Fresh harness over a new SQLite file; the returned TempDir must be kept
/// alive for the duration of the test.
async fn harness() -> (Harness, tempfile::TempDir) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("sync.db")).await.unwrap());
    (build(store).await, dir)
}

async fn build(store: Arc<SqliteStore>) -> Harness {
    let remote = FakeRemote::new();
    let auth = Arc::new(StaticTokenProvider::new("user-1", "tok"));
    let config = SyncConfig::default();
    let (online_tx, online_rx) = watch::channel(true);

    let client = SyncClient::new(
        remote.clone(),
        store.clone(),
        store.clone(),
        auth,
        config.clone(),
    );
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        store.clone(),
        remote.clone(),
        config,
        online_rx,
    ));

    Harness {
        client,
        engine,
        remote,
        online_tx,
        store,
    }
}

/// Flip both the fake remote and the engine's connectivity signal.
fn go_offline(h: &Harness) {
    h.remote.set_online(false);
    h.online_tx.send(false).unwrap();
}

fn go_online(h: &Harness) {
    h.remote.set_online(true);
    h.online_tx.send(true).unwrap();
}

// =============================================================================
// Core scenarios
// =============================================================================

/// Offline save queues; reconnect + drain delivers and empties the queue.
#[tokio::test]
async fn scenario_offline_save_then_drain() {
    let (h, _dir) = harness().await;
    let mut events = h.engine.subscribe();

    go_offline(&h);

    let outcome = h
        .client
        .save_entity("audits/u1/x1", &json!({"id": "x1", "value": 1}))
        .await
        .unwrap();
    assert!(outcome.is_queued());
    assert_eq!(h.engine.status().await.unwrap().queue_length, 1);

    go_online(&h);
    let report = h.engine.drain().await.unwrap();
    assert_eq!(report.replayed, 1);
    assert!(report.is_clean());

    assert_eq!(
        h.remote.stored("audits/u1/x1").await,
        Some(json!({"id": "x1", "value": 1}))
    );
    assert_eq!(h.engine.status().await.unwrap().queue_length, 0);

    let event = events.recv().await.unwrap();
    assert_eq!(event.outcome, SyncOutcome::Success);
    assert_eq!(event.entry.target_path, "audits/u1/x1");
}

/// Four consecutive failed drain passes exhaust the ceiling: the entry is
/// discarded with a failed event and the queue empties.
#[tokio::test]
async fn scenario_retry_ceiling_abandons_entry() {
    let (h, _dir) = harness().await;
    let mut events = h.engine.subscribe();

    go_offline(&h);
    h.client
        .save_entity("audits/u1/bad", &json!({"id": "bad"}))
        .await
        .unwrap();

    // Back online but the remote now rejects everything
    go_online(&h);
    h.remote.set_reject_all(true);

    for pass in 1..=3u32 {
        let report = h.engine.drain().await.unwrap();
        assert_eq!(report.requeued, 1, "pass {}", pass);
        let pending = fieldsync::QueueStore::list_all(h.store.as_ref()).await.unwrap();
        assert_eq!(pending[0].retry_count, pass);
    }

    let report = h.engine.drain().await.unwrap();
    assert_eq!(report.abandoned, 1);
    assert_eq!(h.engine.status().await.unwrap().queue_length, 0);

    let event = events.recv().await.unwrap();
    assert_eq!(event.outcome, SyncOutcome::Failed);
    assert_eq!(event.entry.retry_count, 4);
}

/// A cached read survives a network cut, serves stale past expiry, and
/// only disappears when explicitly evicted.
#[tokio::test]
async fn scenario_cached_read_with_stale_fallback() {
    let (h, _dir) = harness().await;

    h.remote
        .state
        .lock()
        .await
        .insert("templates/public/t1".into(), json!({"name": "Fire safety"}));

    // First read goes to the network and caches
    let first = h.client.get_entity("templates/public/t1").await.unwrap();
    assert_eq!(first, json!({"name": "Fire safety"}));
    let calls_after_first = h.remote.call_count();

    // Network cut: second read inside the TTL is served from cache
    go_offline(&h);
    let second = h.client.get_entity("templates/public/t1").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(h.remote.call_count(), calls_after_first);

    // Force the entry past its expiry: fresh read misses, stale serves
    fieldsync::CacheStore::put(h.store.as_ref(), "templates/public/t1", &first, -1)
        .await
        .unwrap();
    let stale = h.client.get_entity("templates/public/t1").await.unwrap();
    assert_eq!(stale, first);

    // Evicted cache and no network: the failure finally surfaces
    fieldsync::CacheStore::evict(h.store.as_ref(), "templates/public/t1")
        .await
        .unwrap();
    let err = h.client.get_entity("templates/public/t1").await.unwrap_err();
    assert!(matches!(err, SyncError::Offline));
}

/// Two queued writes to one path replay in order; the remote ends up with
/// the last value and the queue is empty.
#[tokio::test]
async fn scenario_last_write_wins_per_path() {
    let (h, _dir) = harness().await;

    go_offline(&h);
    h.client
        .save_entity("audits/u1/a1", &json!({"rev": "v1"}))
        .await
        .unwrap();
    h.client
        .save_entity("audits/u1/a1", &json!({"rev": "v2"}))
        .await
        .unwrap();
    assert_eq!(h.engine.status().await.unwrap().queue_length, 2);

    go_online(&h);
    let report = h.engine.drain().await.unwrap();
    assert_eq!(report.replayed, 2);

    assert_eq!(h.remote.stored("audits/u1/a1").await, Some(json!({"rev": "v2"})));
    assert_eq!(h.engine.status().await.unwrap().queue_length, 0);
}

/// An offline delete queues and replays like a write.
#[tokio::test]
async fn scenario_offline_delete_replays() {
    let (h, _dir) = harness().await;

    h.client
        .save_entity("audits/u1/a1", &json!({"id": "a1"}))
        .await
        .unwrap();
    assert!(h.remote.stored("audits/u1/a1").await.is_some());

    go_offline(&h);
    let outcome = h.client.delete_entity("audits/u1/a1").await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Queued(ref e) if e.operation == Operation::Delete));

    go_online(&h);
    h.engine.drain().await.unwrap();

    assert_eq!(h.remote.stored("audits/u1/a1").await, None);
}

/// Rejected writes surface immediately and never enter the queue.
#[tokio::test]
async fn scenario_rejection_is_not_queued() {
    let (h, _dir) = harness().await;
    h.remote.set_reject_all(true);

    let err = h
        .client
        .save_entity("audits/u1/a1", &json!({"id": "a1"}))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteRejected { status: 500, .. }));
    assert_eq!(h.engine.status().await.unwrap().queue_length, 0);
}

// =============================================================================
// Durability
// =============================================================================

/// Writes queued in one session drain after a restart of the stores.
#[tokio::test]
async fn durability_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sync.db");

    // Session one: queue two writes while offline, then "crash"
    {
        let store = Arc::new(SqliteStore::open(&db_path).await.unwrap());
        let h = build(store).await;
        go_offline(&h);
        h.client
            .save_entity("audits/u1/a1", &json!({"rev": "v1"}))
            .await
            .unwrap();
        h.client.delete_entity("audits/u1/old").await.unwrap();
        assert_eq!(h.engine.status().await.unwrap().queue_length, 2);
    }

    // Session two: fresh stores over the same file, connectivity available
    let store = Arc::new(SqliteStore::open(&db_path).await.unwrap());
    let pending = fieldsync::QueueStore::list_all(store.as_ref()).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].operation, Operation::Put);
    assert_eq!(pending[1].operation, Operation::Delete);

    let remote = FakeRemote::new();
    let (_online_tx, online_rx) = watch::channel(true);
    let engine = SyncEngine::new(
        store.clone(),
        store.clone(),
        remote.clone(),
        SyncConfig::default(),
        online_rx,
    );

    let report = engine.drain().await.unwrap();
    assert_eq!(report.replayed, 2);
    assert_eq!(remote.stored("audits/u1/a1").await, Some(json!({"rev": "v1"})));
}
