// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the split store.
//!
//! # Example
//!
//! ```
//! use split_store::{HostFamily, SplitStoreConfig};
//!
//! // Minimal config (uses defaults)
//! let config = SplitStoreConfig::default();
//! assert_eq!(config.sync_flag_key, "bt-sync-enabled");
//! assert_eq!(config.syncable_prefixes.len(), 3);
//!
//! // Parsed from the host's settings blob
//! let config: SplitStoreConfig = serde_json::from_str(r#"{"host": "firefox"}"#).unwrap();
//! assert_eq!(config.host, HostFamily::Firefox);
//! ```

use serde::Deserialize;

use crate::quota::QuotaLimits;
use crate::routing::DEFAULT_SYNCABLE_PREFIXES;

/// Extension host family the storage areas are bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostFamily {
    #[default]
    Chrome,
    Firefox,
}

impl HostFamily {
    /// `storage.sync` limits published by the host.
    ///
    /// Firefox mirrors Chrome's numbers.
    #[must_use]
    pub const fn sync_limits(self) -> QuotaLimits {
        match self {
            Self::Chrome | Self::Firefox => QuotaLimits::sync_default(),
        }
    }

    /// Name of the host's extension API object.
    #[must_use]
    pub fn api_namespace(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "browser",
        }
    }
}

/// Configuration for the split store.
///
/// All fields have defaults; the syncable prefix set is fixed for the life
/// of the store.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitStoreConfig {
    /// Host family (only affects which API object the areas bind to)
    #[serde(default)]
    pub host: HostFamily,

    /// Key prefixes that move to the sync area when sync is enabled
    #[serde(default = "default_syncable_prefixes")]
    pub syncable_prefixes: Vec<String>,

    /// Local key holding the persisted sync-enabled flag
    #[serde(default = "default_sync_flag_key")]
    pub sync_flag_key: String,

    /// Periodic quota refresh in seconds (0 = on demand only)
    #[serde(default = "default_quota_refresh_interval_secs")]
    pub quota_refresh_interval_secs: u64,
}

fn default_syncable_prefixes() -> Vec<String> {
    DEFAULT_SYNCABLE_PREFIXES.iter().map(|p| p.to_string()).collect()
}
fn default_sync_flag_key() -> String { "bt-sync-enabled".to_string() }
fn default_quota_refresh_interval_secs() -> u64 { 0 }

impl Default for SplitStoreConfig {
    fn default() -> Self {
        Self {
            host: HostFamily::default(),
            syncable_prefixes: default_syncable_prefixes(),
            sync_flag_key: default_sync_flag_key(),
            quota_refresh_interval_secs: default_quota_refresh_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SplitStoreConfig::default();
        assert_eq!(config.host, HostFamily::Chrome);
        assert_eq!(config.syncable_prefixes, vec!["bookmark-folders", "bookmark-trades--", "trade-history"]);
        assert_eq!(config.sync_flag_key, "bt-sync-enabled");
        assert_eq!(config.quota_refresh_interval_secs, 0);
    }

    #[test]
    fn test_empty_json_matches_default() {
        let parsed: SplitStoreConfig = serde_json::from_str("{}").unwrap();
        let default = SplitStoreConfig::default();
        assert_eq!(parsed.host, default.host);
        assert_eq!(parsed.syncable_prefixes, default.syncable_prefixes);
        assert_eq!(parsed.sync_flag_key, default.sync_flag_key);
    }

    #[test]
    fn test_overrides() {
        let parsed: SplitStoreConfig = serde_json::from_str(
            r#"{"host": "firefox", "syncable_prefixes": ["notes-"], "quota_refresh_interval_secs": 30}"#,
        )
        .unwrap();
        assert_eq!(parsed.host, HostFamily::Firefox);
        assert_eq!(parsed.syncable_prefixes, vec!["notes-"]);
        assert_eq!(parsed.quota_refresh_interval_secs, 30);
    }

    #[test]
    fn test_host_family() {
        assert_eq!(HostFamily::Chrome.api_namespace(), "chrome");
        assert_eq!(HostFamily::Firefox.api_namespace(), "browser");
        assert_eq!(HostFamily::Firefox.sync_limits(), QuotaLimits::sync_default());
    }

    #[test]
    fn test_unknown_host_rejected() {
        let parsed: Result<SplitStoreConfig, _> = serde_json::from_str(r#"{"host": "safari"}"#);
        assert!(parsed.is_err());
    }
}
