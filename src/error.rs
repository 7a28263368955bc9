// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Failure taxonomy.
//!
//! [`SyncError`] is the surface error of the crate; [`StorageError`] covers
//! the local persistence layer and converts into `SyncError::Storage`.
//!
//! Only [`SyncError::Offline`] triggers auto-queueing of writes at the
//! facade; everything else is surfaced to the caller untouched.

use thiserror::Error;

/// Local persistence failure (durable queue or cache).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Record not found")]
    NotFound,
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Surface error of the sync layer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No valid token obtainable. Never retried automatically.
    #[error("No authentication token available")]
    Unauthenticated,

    /// The remote responded with a non-success status. Never auto-queued:
    /// retrying a request the remote actively rejected would never succeed.
    #[error("Remote rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// The network call could not be dispatched at all. The only condition
    /// that converts a write into a queued outcome.
    #[error("Network unreachable")]
    Offline,

    /// Caller error, e.g. PUT without a payload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local persistence failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Whether this failure means the device is offline.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }
}
