//! Public types for the sync engine.

use serde::{Deserialize, Serialize};

use crate::entry::QueueEntry;

/// How a replay attempt resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// The entry was delivered to the remote and removed from the queue.
    Success,
    /// The entry exhausted its retries and was discarded.
    Failed,
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Broadcast after each replay resolution. UI layers subscribe to show
/// "synced" toasts or surface abandoned writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub outcome: SyncOutcome,
    pub entry: QueueEntry,
}

/// Point-in-time view of the sync layer, recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub queue_length: u64,
    pub is_syncing: bool,
    pub is_online: bool,
}

/// Counters for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries read from the queue at the start of the pass.
    pub attempted: usize,
    /// Entries delivered and removed.
    pub replayed: usize,
    /// Entries discarded past the retry ceiling.
    pub abandoned: usize,
    /// Entries left in the queue for the next pass.
    pub requeued: usize,
}

impl DrainReport {
    /// Whether every attempted entry was delivered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0 && self.requeued == 0
    }
}

/// One-way sync request from a secondary execution context (e.g. a service
/// worker bridge). No response is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncRequest;

/// Cheap cloneable handle for requesting a drain from outside the engine.
#[derive(Clone)]
pub struct SyncHandle {
    pub(super) tx: tokio::sync::mpsc::UnboundedSender<SyncRequest>,
}

impl SyncHandle {
    /// Ask the running engine to drain soon. A no-op if the engine's run
    /// loop has shut down.
    pub fn request_sync(&self) {
        let _ = self.tx.send(SyncRequest);
    }
}
