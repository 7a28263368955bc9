//! Property-based tests for queue-order and retry invariants.
//!
//! Run with: `cargo test --test proptest_queue`

use proptest::prelude::*;
use serde_json::json;
use std::collections::HashMap;

use fieldsync::{MemoryQueueStore, Operation, QueueEntry, QueueStore};

// =============================================================================
// Strategies
// =============================================================================

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![Just(Operation::Put), Just(Operation::Delete)]
}

/// Entries with plausible paths; Put carries a payload, Delete does not.
fn entry_strategy() -> impl Strategy<Value = QueueEntry> {
    (
        operation_strategy(),
        "[a-z]{1,8}(/[a-z0-9]{1,8}){0,3}", // path like "audits/u1/a42"
        any::<i32>(),
    )
        .prop_map(|(op, path, n)| {
            let payload = match op {
                Operation::Put => Some(json!({"n": n})),
                Operation::Delete => None,
            };
            QueueEntry::new(op, path, payload, HashMap::new())
        })
}

async fn fill(store: &MemoryQueueStore, entries: &[QueueEntry]) {
    for entry in entries {
        store.enqueue(entry).await.unwrap();
    }
}

// =============================================================================
// Queue-order properties
// =============================================================================

proptest! {
    /// list_all returns exactly the enqueued sequence, in enqueue order.
    #[test]
    fn prop_list_all_preserves_fifo(entries in prop::collection::vec(entry_strategy(), 0..32)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = MemoryQueueStore::new();
            fill(&store, &entries).await;

            let listed = store.list_all().await.unwrap();
            prop_assert_eq!(listed.len(), entries.len());
            for (listed, original) in listed.iter().zip(&entries) {
                prop_assert_eq!(&listed.id, &original.id);
                prop_assert_eq!(&listed.target_path, &original.target_path);
            }
            Ok(())
        })?;
    }

    /// Removing an id twice leaves the queue exactly as removing it once.
    #[test]
    fn prop_remove_is_idempotent(
        entries in prop::collection::vec(entry_strategy(), 1..16),
        pick in any::<prop::sample::Index>(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = MemoryQueueStore::new();
            fill(&store, &entries).await;

            let victim = entries[pick.index(entries.len())].id.clone();
            store.remove(&victim).await.unwrap();
            let after_once: Vec<String> =
                store.list_all().await.unwrap().into_iter().map(|e| e.id).collect();

            store.remove(&victim).await.unwrap();
            let after_twice: Vec<String> =
                store.list_all().await.unwrap().into_iter().map(|e| e.id).collect();

            prop_assert_eq!(after_once, after_twice);
            Ok(())
        })?;
    }

    /// replace_all reproduces an arbitrary subset in its given order, with
    /// retry counts intact.
    #[test]
    fn prop_replace_all_is_faithful(
        entries in prop::collection::vec(entry_strategy(), 0..24),
        keep_mask in prop::collection::vec(any::<bool>(), 0..24),
        bumps in prop::collection::vec(0u32..5, 0..24),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = MemoryQueueStore::new();
            fill(&store, &entries).await;

            // Simulate a drain pass outcome: drop some entries, bump retries
            // on the survivors
            let survivors: Vec<QueueEntry> = entries
                .iter()
                .enumerate()
                .filter(|(i, _)| keep_mask.get(*i).copied().unwrap_or(true))
                .map(|(i, e)| {
                    let mut e = e.clone();
                    e.retry_count += bumps.get(i).copied().unwrap_or(0);
                    e
                })
                .collect();

            store.replace_all(&survivors).await.unwrap();

            let listed = store.list_all().await.unwrap();
            prop_assert_eq!(listed.len(), survivors.len());
            for (listed, expected) in listed.iter().zip(&survivors) {
                prop_assert_eq!(&listed.id, &expected.id);
                prop_assert_eq!(listed.retry_count, expected.retry_count);
            }
            Ok(())
        })?;
    }
}

// =============================================================================
// Entry properties
// =============================================================================

proptest! {
    /// Entry serialization round-trips through JSON without loss.
    #[test]
    fn prop_entry_serde_roundtrip(entry in entry_strategy()) {
        let text = serde_json::to_string(&entry).unwrap();
        let back: QueueEntry = serde_json::from_str(&text).unwrap();

        prop_assert_eq!(back.id, entry.id);
        prop_assert_eq!(back.operation, entry.operation);
        prop_assert_eq!(back.target_path, entry.target_path);
        prop_assert_eq!(back.payload, entry.payload);
        prop_assert_eq!(back.enqueued_at, entry.enqueued_at);
        prop_assert_eq!(back.retry_count, entry.retry_count);
    }

    /// Ids never collide even for entries minted in the same millisecond.
    #[test]
    fn prop_entry_ids_unique(count in 1usize..64) {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..count {
            let entry = QueueEntry::new(Operation::Delete, "p".into(), None, HashMap::new());
            prop_assert!(seen.insert(entry.id));
        }
    }
}
