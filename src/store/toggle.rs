// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync toggle and quota refresh.
//!
//! Toggle flow:
//! 1. Target equals the current flag → success, nothing touched
//! 2. Run the migration towards the target area
//! 3. Persist the flag in the local area
//! 4. Flip the in-memory flag
//! 5. Enabling: refresh the quota snapshot. Disabling: drop it.
//!
//! A failure in steps 2-3 returns `success: false` and leaves the flag as it
//! was. Keys copied before a failure stay where they were written.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::migration::{Direction, MigrationEngine};
use crate::monitor::QuotaSnapshot;
use crate::storage::traits::StorageError;

use super::{SplitStore, SyncResult};

impl SplitStore {
    /// Turn cross-device sync on or off, migrating the syncable keys.
    ///
    /// This is the only way the sync flag changes. It never returns an error;
    /// failures come back as `SyncResult { success: false, error }`.
    #[tracing::instrument(skip(self), fields(current = self.sync_enabled()))]
    pub async fn set_sync_enabled(&self, enabled: bool) -> SyncResult {
        if enabled == self.sync_enabled() {
            debug!("Sync already in requested state");
            return SyncResult::ok();
        }

        let direction = if enabled { Direction::ToSync } else { Direction::ToLocal };
        let engine = MigrationEngine::new(
            &self.router,
            self.local.as_ref(),
            self.sync.as_ref(),
            self.monitor.limits(),
        );

        if let Err(e) = engine.run(direction).await {
            warn!(error = %e, "Sync toggle aborted");
            return SyncResult::failed(e);
        }

        if let Err(e) = self.write_sync_flag(enabled).await {
            error!(error = %e, "Migration succeeded but the sync flag could not be saved");
            return SyncResult::failed(format!("Failed to save sync setting: {}", e));
        }

        *self.sync_enabled.write() = enabled;
        crate::metrics::set_sync_enabled(enabled);

        if enabled {
            if let Err(e) = self.monitor.refresh(self.sync.as_ref()).await {
                // The toggle is committed; only the read model is missing
                warn!(error = %e, "Quota refresh failed after enabling sync");
                self.monitor.clear();
            }
        } else {
            self.monitor.clear();
        }

        info!(enabled, "Sync setting changed");
        SyncResult::ok()
    }

    /// Query the sync area and replace the quota snapshot.
    ///
    /// Works regardless of the flag, but the numbers only matter while sync
    /// is enabled.
    pub async fn refresh_quota(&self) -> Result<QuotaSnapshot, StorageError> {
        self.monitor.refresh(self.sync.as_ref()).await
    }

    /// Refresh the quota snapshot every `every` while sync is enabled.
    ///
    /// The task holds only a weak reference and exits once the store is
    /// dropped. Must be called from within a tokio runtime.
    pub fn spawn_quota_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    debug!("Split store dropped, stopping quota refresh");
                    break;
                };
                if !store.sync_enabled() {
                    continue;
                }
                if let Err(e) = store.refresh_quota().await {
                    warn!(error = %e, "Periodic quota refresh failed");
                }
            }
        })
    }

    /// Start the periodic refresh configured by `quota_refresh_interval_secs`.
    ///
    /// Returns `None` when the interval is 0.
    pub fn spawn_configured_quota_refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        match self.config.quota_refresh_interval_secs {
            0 => None,
            secs => Some(self.spawn_quota_refresh(Duration::from_secs(secs))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitStoreConfig;
    use crate::quota::QuotaLimits;
    use crate::storage::memory::MemoryArea;
    use crate::storage::traits::StorageArea;
    use serde_json::json;

    async fn open(local: &Arc<MemoryArea>, sync: &Arc<MemoryArea>) -> SplitStore {
        SplitStore::open(SplitStoreConfig::default(), local.clone(), sync.clone())
            .await
            .unwrap()
    }

    fn areas(limits: QuotaLimits) -> (Arc<MemoryArea>, Arc<MemoryArea>) {
        (Arc::new(MemoryArea::new()), Arc::new(MemoryArea::with_limits(limits)))
    }

    #[tokio::test]
    async fn test_toggle_to_current_state_is_noop() {
        let (local, sync) = areas(QuotaLimits::sync_default());
        let store = open(&local, &sync).await;

        let result = store.set_sync_enabled(false).await;

        assert!(result.success);
        assert!(!local.contains("bt-sync-enabled"));
        assert!(sync.is_empty());
    }

    #[tokio::test]
    async fn test_enable_persists_flag_and_snapshot() {
        let (local, sync) = areas(QuotaLimits::sync_default());
        let store = open(&local, &sync).await;
        store.set_value("bookmark-folders", &json!(["a"]), None).await.unwrap();

        let result = store.set_sync_enabled(true).await;

        assert_eq!(result, SyncResult::ok());
        assert!(store.sync_enabled());
        assert_eq!(local.peek("bt-sync-enabled"), Some(json!(true)));
        assert!(sync.contains("bookmark-folders"));
        assert_eq!(store.quota_snapshot().unwrap().item_count, 1);
        assert!(!store.formatted_quota_usage().is_empty());
    }

    #[tokio::test]
    async fn test_enable_refused_keeps_flag_false() {
        let (local, sync) = areas(QuotaLimits { total_bytes: 50, bytes_per_item: 8_192, max_items: 512 });
        let store = open(&local, &sync).await;
        store.set_value("trade-history", &"x".repeat(200), None).await.unwrap();

        let result = store.set_sync_enabled(true).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("exceeds sync quota (50 B)"));
        assert!(!store.sync_enabled());
        assert!(!local.contains("bt-sync-enabled"));
        assert!(sync.is_empty());
        assert!(store.quota_snapshot().is_none());
    }

    #[tokio::test]
    async fn test_disable_copies_back_and_clears_snapshot() {
        let (local, sync) = areas(QuotaLimits::sync_default());
        let store = open(&local, &sync).await;
        assert!(store.set_sync_enabled(true).await.success);

        // Written while enabled, so it only exists in sync
        store.set_value("bookmark-trades--f1", &json!([42]), None).await.unwrap();
        assert!(!local.contains("bookmark-trades--f1"));

        let result = store.set_sync_enabled(false).await;

        assert!(result.success);
        assert!(!store.sync_enabled());
        assert_eq!(local.peek("bt-sync-enabled"), Some(json!(false)));
        assert!(local.contains("bookmark-trades--f1"));
        // Sync copy is left behind
        assert!(sync.contains("bookmark-trades--f1"));
        assert!(store.quota_snapshot().is_none());

        let read: Option<Vec<u32>> = store.get_value("bookmark-trades--f1", None).await.unwrap();
        assert_eq!(read, Some(vec![42]));
    }

    #[tokio::test]
    async fn test_refresh_quota_on_demand() {
        let (local, sync) = areas(QuotaLimits::sync_default());
        let store = open(&local, &sync).await;
        sync.set_one("anything", json!(1)).await.unwrap();

        let snapshot = store.refresh_quota().await.unwrap();

        assert_eq!(snapshot.item_count, 1);
        assert_eq!(store.quota_snapshot(), Some(snapshot));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_runs_only_while_enabled() {
        let (local, sync) = areas(QuotaLimits::sync_default());
        let store = Arc::new(open(&local, &sync).await);
        let handle = store.spawn_quota_refresh(Duration::from_secs(30));

        sync.set_one("foreign", json!(1)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(store.quota_snapshot().is_none());

        assert!(store.set_sync_enabled(true).await.success);
        assert_eq!(store.quota_snapshot().unwrap().item_count, 1);

        sync.set_one("trade-history", json!({"value": 1, "expiresAt": null})).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.quota_snapshot().unwrap().item_count, 2);

        drop(store);
        tokio::time::sleep(Duration::from_secs(30)).await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_configured_refresh_disabled_by_default() {
        let (local, sync) = areas(QuotaLimits::sync_default());
        let store = Arc::new(open(&local, &sync).await);
        assert!(store.spawn_configured_quota_refresh().is_none());
    }
}
