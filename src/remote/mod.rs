//! Remote key-value client.
//!
//! [`RemoteStore`] is the seam between the sync layer and the network; the
//! HTTP implementation lives in [`http`]. Tests script this trait directly
//! to simulate outages and rejections.

pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::entry::Method;
use crate::error::SyncError;

/// One authenticated request against the remote key-value endpoint.
///
/// Implementations translate transport outcomes into the typed failure
/// taxonomy of [`SyncError`]; they never touch the cache or the queue —
/// those are composed by higher layers.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Perform one request.
    ///
    /// `path` is a non-empty logical key; it may end in `/` to denote a
    /// listing prefix when combined with `params["list"] = "true"`. For
    /// [`Method::Put`], `data` must be present.
    async fn request(
        &self,
        method: Method,
        path: &str,
        data: Option<&Value>,
        params: &HashMap<String, String>,
    ) -> Result<Value, SyncError>;
}

pub use http::HttpRemote;
