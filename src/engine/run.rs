// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Engine run loop: periodic drains, connectivity wakeups, external
//! triggers, cache sweeps.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::SyncEngine;

impl SyncEngine {
    /// Run the engine until the owning task is dropped.
    ///
    /// Schedule: an initial startup delay, then a drain every
    /// `sync_interval_secs`; an immediate drain on every offline→online
    /// transition and on every [`super::SyncHandle::request_sync`]; an
    /// expired-cache sweep every `cache_sweep_interval_secs`.
    ///
    /// Page/process teardown simply abandons in-flight work; persisted
    /// queue entries drain on the next session.
    pub async fn run(&self) {
        info!(
            startup_delay_secs = self.config.startup_delay_secs,
            sync_interval_secs = self.config.sync_interval_secs,
            "Sync engine running"
        );

        // Let the rest of the application finish initializing first
        tokio::time::sleep(Duration::from_secs(self.config.startup_delay_secs)).await;

        let mut sync_interval =
            tokio::time::interval(Duration::from_secs(self.config.sync_interval_secs));
        let mut sweep_interval =
            tokio::time::interval(Duration::from_secs(self.config.cache_sweep_interval_secs));

        let mut online = self.online_rx.clone();
        let mut trigger = self.trigger_rx.lock().await;

        loop {
            tokio::select! {
                _ = sync_interval.tick() => {
                    if let Err(e) = self.drain().await {
                        warn!(error = %e, "Periodic drain failed");
                    }
                }

                Ok(()) = online.changed() => {
                    let is_online = *online.borrow_and_update();
                    if is_online {
                        info!("Connectivity restored, draining queue");
                        if let Err(e) = self.drain().await {
                            warn!(error = %e, "Post-reconnect drain failed");
                        }
                    } else {
                        debug!("Connectivity lost");
                    }
                }

                Some(_) = trigger.recv() => {
                    debug!("External sync request received");
                    if let Err(e) = self.drain().await {
                        warn!(error = %e, "Requested drain failed");
                    }
                }

                _ = sweep_interval.tick() => {
                    match self.cache.sweep_expired().await {
                        Ok(removed) if removed > 0 => {
                            info!(removed, "Expired cache entries swept");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Cache sweep failed"),
                    }
                }
            }
        }
    }
}
