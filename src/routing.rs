// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Key routing between the local and sync areas.
//!
//! # Example
//!
//! ```
//! use split_store::routing::{format_key, Backend, KeyRouter};
//!
//! let router = KeyRouter::default();
//! let key = format_key("Bookmark-Folders", Some("Settlers"));
//! assert_eq!(key, "bookmark-folders--settlers");
//!
//! assert_eq!(router.route(&key, false), Backend::Local);
//! assert_eq!(router.route(&key, true), Backend::Sync);
//! assert_eq!(router.route("poe-ninja-chaos-ratios-cache", true), Backend::Local);
//! ```

use serde::Serialize;

/// Prefixes of keys that follow the user across devices when sync is on.
pub const DEFAULT_SYNCABLE_PREFIXES: [&str; 3] = ["bookmark-folders", "bookmark-trades--", "trade-history"];

/// Separator between a key and its league tag.
pub const LEAGUE_SEPARATOR: &str = "--";

/// Physical storage area a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Sync,
}

impl Backend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sync => "sync",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the stored form of a key: `key--league`, lower-cased.
#[must_use]
pub fn format_key(key: &str, league: Option<&str>) -> String {
    let mut formatted = key.to_string();
    if let Some(league) = league.filter(|l| !l.is_empty()) {
        formatted.push_str(LEAGUE_SEPARATOR);
        formatted.push_str(league);
    }
    formatted.to_lowercase()
}

/// Decides which area a stored key belongs to.
///
/// Holds the static syncable prefix set. Routing is a pure function of the
/// key and the sync flag; the migration engine relies on that to partition
/// keys without extra state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRouter {
    prefixes: Vec<String>,
}

impl Default for KeyRouter {
    fn default() -> Self {
        Self::new(DEFAULT_SYNCABLE_PREFIXES)
    }
}

impl KeyRouter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `key` starts with one of the syncable prefixes.
    #[must_use]
    pub fn is_syncable(&self, key: &str) -> bool {
        self.prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
    }

    #[must_use]
    pub fn route(&self, key: &str, sync_enabled: bool) -> Backend {
        if sync_enabled && self.is_syncable(key) {
            Backend::Sync
        } else {
            Backend::Local
        }
    }

    /// Keep only the syncable keys, preserving order.
    pub fn syncable<'a, I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        keys.into_iter().filter(|k| self.is_syncable(k)).cloned().collect()
    }
}
