//! Configuration for the sync layer.
//!
//! # Example
//!
//! ```
//! use fieldsync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.sync_interval_secs, 30);
//! assert_eq!(config.retry_ceiling, 3);
//!
//! // Full config
//! let config = SyncConfig {
//!     base_url: "https://storage.example.com/api".into(),
//!     db_path: Some("./fieldsync.db".into()),
//!     listing_cache_ttl_ms: 60_000,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the sync layer.
///
/// All fields have sensible defaults. At minimum you should configure
/// `base_url`; leave `db_path` unset to run on in-memory stores.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Remote key-value endpoint base URL.
    #[serde(default)]
    pub base_url: String,

    /// SQLite file for the durable queue and cache. None = in-memory stores
    /// (nothing survives a restart).
    #[serde(default)]
    pub db_path: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Periodic drain interval in seconds.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Delay before the first periodic drain, to let the rest of the
    /// application finish initializing.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Failed replay attempts tolerated before an entry is abandoned.
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,

    /// Interval between expired-cache sweeps, in seconds.
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,

    /// Cache TTL for entity reads, in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub default_cache_ttl_ms: i64,

    /// Cache TTL for listings, in milliseconds. Listings change often, so
    /// this is much shorter than the entity TTL.
    #[serde(default = "default_listing_cache_ttl_ms")]
    pub listing_cache_ttl_ms: i64,
}

fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_sync_interval_secs() -> u64 { 30 }
fn default_startup_delay_secs() -> u64 { 5 }
fn default_retry_ceiling() -> u32 { 3 }
fn default_cache_sweep_interval_secs() -> u64 { 3600 }
fn default_cache_ttl_ms() -> i64 { 3_600_000 } // 1 hour
fn default_listing_cache_ttl_ms() -> i64 { 300_000 } // 5 minutes

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            db_path: None,
            request_timeout_ms: default_request_timeout_ms(),
            sync_interval_secs: default_sync_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            retry_ceiling: default_retry_ceiling(),
            cache_sweep_interval_secs: default_cache_sweep_interval_secs(),
            default_cache_ttl_ms: default_cache_ttl_ms(),
            listing_cache_ttl_ms: default_listing_cache_ttl_ms(),
        }
    }
}
