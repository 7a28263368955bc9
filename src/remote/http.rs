// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP implementation of [`RemoteStore`] over reqwest.
//!
//! Failure mapping:
//! - no token from the provider → [`SyncError::Unauthenticated`]
//! - transport error with no HTTP response (connect, timeout) →
//!   [`SyncError::Offline`]
//! - non-2xx response → [`SyncError::RemoteRejected`] with the body as the
//!   message
//!
//! Only `Offline` is converted into a queued outcome upstream; everything
//! else surfaces to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::config::SyncConfig;
use crate::entry::Method;
use crate::error::SyncError;
use super::RemoteStore;

pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<dyn TokenProvider>,
}

impl HttpRemote {
    pub fn new(config: &SyncConfig, auth: Arc<dyn TokenProvider>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| SyncError::InvalidInput(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn request(
        &self,
        method: Method,
        path: &str,
        data: Option<&Value>,
        params: &HashMap<String, String>,
    ) -> Result<Value, SyncError> {
        if path.is_empty() {
            return Err(SyncError::InvalidInput("Empty request path".into()));
        }
        if method == Method::Put && data.is_none() {
            return Err(SyncError::InvalidInput(format!(
                "PUT to '{}' without a payload",
                path
            )));
        }

        let token = self.auth.token().await.ok_or(SyncError::Unauthenticated)?;

        let url = self.url_for(path);
        let mut builder = match method {
            Method::Get => self.client.get(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        builder = builder.bearer_auth(token);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let (Method::Put, Some(body)) = (method, data) {
            builder = builder.json(body);
        }

        debug!(%method, %url, "Dispatching remote request");

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%method, %url, status = status.as_u16(), "Remote rejected request");
            return Err(SyncError::RemoteRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(map_transport_error)?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| SyncError::RemoteRejected {
            status: status.as_u16(),
            message: format!("Malformed JSON response: {}", e),
        })
    }
}

/// An error with no HTTP response means the call never reached the remote.
fn map_transport_error(e: reqwest::Error) -> SyncError {
    if e.is_builder() {
        SyncError::InvalidInput(format!("Malformed request: {}", e))
    } else {
        debug!(error = %e, "Transport failure, treating as offline");
        SyncError::Offline
    }
}
