//! Queue entry data structures.
//!
//! A [`QueueEntry`] is one pending mutation captured while the device was
//! offline. Entries are persisted by a [`crate::storage::traits::QueueStore`]
//! and replayed in FIFO order by the sync engine.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutations that can be queued for deferred replay.
///
/// Reads are never queued, so there is deliberately no `Get` variant here —
/// see [`Method`] for the full request surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Put,
    Delete,
}

impl Operation {
    /// Stable wire name, used as the storage column value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Parse the storage column value back into an operation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request methods accepted by the remote client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl From<Operation> for Method {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Put => Self::Put,
            Operation::Delete => Self::Delete,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single pending mutation.
///
/// # Example
///
/// ```
/// use fieldsync::{QueueEntry, Operation};
/// use serde_json::json;
///
/// let entry = QueueEntry::new(
///     Operation::Put,
///     "audits/user-1/a42".into(),
///     Some(json!({"id": "a42", "score": 97})),
///     Default::default(),
/// );
///
/// assert_eq!(entry.retry_count, 0);
/// assert!(entry.enqueued_at > 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique id assigned at enqueue time: epoch millis plus a random suffix.
    /// Used as the record key and for idempotent removal.
    pub id: String,
    /// What to replay.
    pub operation: Operation,
    /// Logical key/path in the remote store the operation applies to.
    pub target_path: String,
    /// Opaque JSON payload. `Some` for Put, `None` for Delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Auxiliary parameters forwarded verbatim to the remote call.
    #[serde(default)]
    pub query_params: HashMap<String, String>,
    /// Enqueue timestamp (epoch millis). Immutable.
    pub enqueued_at: i64,
    /// Failed replay attempts so far. Strictly increases over the entry's
    /// lifetime; the engine discards the entry once it exceeds the ceiling.
    pub retry_count: u32,
}

impl QueueEntry {
    /// Create a new entry with a fresh id, current timestamp and zero retries.
    pub fn new(
        operation: Operation,
        target_path: String,
        payload: Option<Value>,
        query_params: HashMap<String, String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: generate_id(now),
            operation,
            target_path,
            payload,
            query_params,
            enqueued_at: now,
            retry_count: 0,
        }
    }
}

/// A memoized read result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Logical key, unique per cache store.
    pub path: String,
    /// Opaque JSON value.
    pub data: Value,
    /// Absolute expiry timestamp (epoch millis). Past this the entry is
    /// stale and must not be served as fresh.
    pub expires_at: i64,
    /// Timestamp of last write, informational only.
    pub cached_at: i64,
}

impl CacheEntry {
    /// Whether the entry may still be served as fresh.
    #[must_use]
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Monotonic-ish id: millisecond timestamp plus a random uuid suffix.
/// Sorting by id approximates enqueue order; uniqueness comes from the suffix.
fn generate_id(now: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", now, &suffix[..8])
}
