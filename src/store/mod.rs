// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Split store facade.
//!
//! The [`SplitStore`] is the public surface tying the components together:
//! - [`KeyRouter`] picks the area for every key
//! - [`Payload`](crate::payload::Payload) wraps values with their expiry
//! - [`MigrationEngine`](crate::migration::MigrationEngine) moves keys when
//!   the sync flag flips, behind the quota guard
//! - [`QuotaMonitor`] keeps the sync usage snapshot
//!
//! # State
//!
//! The sync flag and the quota snapshot are owned by the store. The flag is
//! read once in [`open`](SplitStore::open) and changed only by
//! [`set_sync_enabled`](SplitStore::set_sync_enabled).
//!
//! Calls are not serialized against each other. Two toggles racing, or a
//! toggle racing a write, have undefined outcomes; the host UI is expected to
//! issue one user action at a time.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use split_store::{MemoryArea, SplitStore, SplitStoreConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), split_store::StorageError> {
//! let config = SplitStoreConfig::default();
//! let local = Arc::new(MemoryArea::new());
//! let sync = Arc::new(MemoryArea::sync_for(config.host));
//!
//! let store = SplitStore::open(config, local, sync).await?;
//! store.set_value("bookmark-folders", &vec!["maps", "uniques"], None).await?;
//!
//! let result = store.set_sync_enabled(true).await;
//! assert!(result.success);
//! assert!(store.quota_snapshot().is_some());
//!
//! let folders: Option<Vec<String>> = store.get_value("bookmark-folders", None).await?;
//! assert_eq!(folders.unwrap(), ["maps", "uniques"]);
//! # Ok(())
//! # }
//! ```

mod api;
mod toggle;
mod types;

pub use types::SyncResult;

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SplitStoreConfig;
use crate::monitor::{QuotaMonitor, QuotaSnapshot};
use crate::quota::QuotaLimits;
use crate::routing::{format_key, Backend, KeyRouter};
use crate::storage::traits::{StorageArea, StorageError};

/// Key-value store split between a local and a sync area.
pub struct SplitStore {
    config: SplitStoreConfig,
    router: KeyRouter,
    local: Arc<dyn StorageArea>,
    sync: Arc<dyn StorageArea>,
    /// In-memory copy of the persisted flag; the router consults this
    sync_enabled: RwLock<bool>,
    monitor: QuotaMonitor,
}

impl SplitStore {
    /// Build the store and run its one-time initialization.
    ///
    /// Reads the sync area's quota constants, loads the persisted sync flag
    /// and, if sync was left enabled, takes a first quota snapshot. A failed
    /// snapshot is logged and leaves [`quota_snapshot`](Self::quota_snapshot)
    /// empty until the next refresh.
    pub async fn open(
        config: SplitStoreConfig,
        local: Arc<dyn StorageArea>,
        sync: Arc<dyn StorageArea>,
    ) -> Result<Self, StorageError> {
        let limits = sync.quota_limits().ok_or_else(|| {
            StorageError::Config("sync storage area does not report quota limits".into())
        })?;

        let store = Self {
            router: KeyRouter::new(config.syncable_prefixes.iter().cloned()),
            config,
            local,
            sync,
            sync_enabled: RwLock::new(false),
            monitor: QuotaMonitor::new(limits),
        };

        let enabled = store.read_sync_flag().await?;
        *store.sync_enabled.write() = enabled;
        crate::metrics::set_sync_enabled(enabled);

        info!(
            host = store.config.host.api_namespace(),
            sync_enabled = enabled,
            prefixes = ?store.router.prefixes(),
            "Split store opened"
        );

        if enabled {
            if let Err(e) = store.monitor.refresh(store.sync.as_ref()).await {
                // Reads and writes don't depend on the snapshot
                warn!(error = %e, "Initial quota refresh failed");
                store.monitor.clear();
            }
        }
        Ok(store)
    }

    #[must_use]
    pub fn config(&self) -> &SplitStoreConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &KeyRouter {
        &self.router
    }

    #[must_use]
    pub fn sync_enabled(&self) -> bool {
        *self.sync_enabled.read()
    }

    #[must_use]
    pub fn quota_limits(&self) -> &QuotaLimits {
        self.monitor.limits()
    }

    /// Latest quota snapshot, `None` before the first refresh or while sync
    /// is disabled.
    #[must_use]
    pub fn quota_snapshot(&self) -> Option<QuotaSnapshot> {
        self.monitor.snapshot()
    }

    /// `"50.0 KB / 100.0 KB (50.0%)"`, or `""` without a snapshot.
    #[must_use]
    pub fn formatted_quota_usage(&self) -> String {
        self.monitor.formatted_usage()
    }

    /// Area a logical key currently routes to.
    #[must_use]
    pub fn backend_for(&self, key: &str, league: Option<&str>) -> Backend {
        self.router.route(&format_key(key, league), self.sync_enabled())
    }

    pub(crate) fn area(&self, backend: Backend) -> &dyn StorageArea {
        match backend {
            Backend::Local => self.local.as_ref(),
            Backend::Sync => self.sync.as_ref(),
        }
    }

    async fn read_sync_flag(&self) -> Result<bool, StorageError> {
        let stored = self.local.get_one(&self.config.sync_flag_key).await?;
        let enabled = match stored {
            Some(Value::Bool(enabled)) => enabled,
            Some(Value::String(text)) => text == "true",
            _ => false,
        };
        debug!(key = %self.config.sync_flag_key, enabled, "Read persisted sync flag");
        Ok(enabled)
    }

    async fn write_sync_flag(&self, enabled: bool) -> Result<(), StorageError> {
        self.local.set_one(&self.config.sync_flag_key, Value::Bool(enabled)).await
    }
}
