// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The drain pass: FIFO replay of the pending queue.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::storage::traits::StorageError;
use super::{DrainReport, SyncEngine, SyncOutcome};

impl SyncEngine {
    /// Replay every pending entry once, in FIFO order, sequentially.
    ///
    /// Sequential replay is load-bearing: parallel replay would reorder
    /// dependent writes to the same path. A failure on one entry never
    /// aborts the pass; every other entry still gets its attempt.
    ///
    /// Returns a no-op report when the device is offline or another drain
    /// is already running on this instance.
    pub async fn drain(&self) -> Result<DrainReport, StorageError> {
        if !self.is_online() {
            debug!("Skipping drain: offline");
            return Ok(DrainReport::default());
        }
        if self.draining.swap(true, Ordering::AcqRel) {
            debug!("Skipping drain: already in progress");
            return Ok(DrainReport::default());
        }
        let _guard = DrainGuard(&self.draining);

        let entries = self.queue.list_all().await?;
        if entries.is_empty() {
            return Ok(DrainReport::default());
        }

        info!(pending = entries.len(), "Starting queue drain");

        let mut report = DrainReport {
            attempted: entries.len(),
            ..Default::default()
        };
        let mut survivors = Vec::new();

        for mut entry in entries {
            let result = self
                .remote
                .request(
                    entry.operation.into(),
                    &entry.target_path,
                    entry.payload.as_ref(),
                    &entry.query_params,
                )
                .await;

            match result {
                Ok(_) => {
                    debug!(id = %entry.id, path = %entry.target_path, "Entry replayed");
                    report.replayed += 1;
                    self.emit(SyncOutcome::Success, entry);
                }
                Err(e) => {
                    // Rejections count the same as offline here: the queue
                    // does not classify retryable vs terminal remote errors
                    entry.retry_count += 1;
                    if entry.retry_count > self.config.retry_ceiling {
                        warn!(
                            id = %entry.id,
                            path = %entry.target_path,
                            retries = entry.retry_count,
                            error = %e,
                            "Abandoning entry past retry ceiling"
                        );
                        report.abandoned += 1;
                        self.emit(SyncOutcome::Failed, entry);
                    } else {
                        debug!(
                            id = %entry.id,
                            retry = entry.retry_count,
                            error = %e,
                            "Replay failed, keeping for next pass"
                        );
                        report.requeued += 1;
                        survivors.push(entry);
                    }
                }
            }
        }

        // Write back removals and retry-count updates in one unit
        self.queue.replace_all(&survivors).await?;

        info!(
            replayed = report.replayed,
            abandoned = report.abandoned,
            requeued = report.requeued,
            "Queue drain complete"
        );
        Ok(report)
    }
}

/// RAII guard to reset the draining flag.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
