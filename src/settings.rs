// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync settings controller.
//!
//! The thin layer a settings page talks to. It turns a [`SyncResult`] into
//! the state a view needs (busy flag, last error, quota warning) and exposes
//! it through plain accessors. Views poll these or wrap them in their own
//! change tracking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::monitor::QuotaSnapshot;
use crate::storage::traits::StorageError;
use crate::store::{SplitStore, SyncResult};

const UNKNOWN_ERROR: &str = "Unknown error";

/// RAII guard to reset the toggling flag, even if the toggle is cancelled.
struct TogglingGuard<'a>(&'a AtomicBool);

impl<'a> TogglingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for TogglingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncSettings {
    store: Arc<SplitStore>,
    toggling: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl SyncSettings {
    #[must_use]
    pub fn new(store: Arc<SplitStore>) -> Self {
        Self {
            store,
            toggling: AtomicBool::new(false),
            last_error: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SplitStore> {
        &self.store
    }

    #[must_use]
    pub fn sync_enabled(&self) -> bool {
        self.store.sync_enabled()
    }

    #[must_use]
    pub fn quota_info(&self) -> Option<QuotaSnapshot> {
        self.store.quota_snapshot()
    }

    #[must_use]
    pub fn formatted_quota_usage(&self) -> String {
        self.store.formatted_quota_usage()
    }

    /// Near the byte quota or the item limit.
    #[must_use]
    pub fn show_quota_warning(&self) -> bool {
        self.quota_info().is_some_and(|info| info.needs_warning())
    }

    #[must_use]
    pub fn is_toggling(&self) -> bool {
        self.toggling.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Toggle sync. Returns `true` on success; on failure the message is
    /// kept in [`last_error`](Self::last_error).
    pub async fn toggle_sync(&self, enabled: bool) -> bool {
        let _toggling = TogglingGuard::set(&self.toggling);
        *self.last_error.write() = None;

        let SyncResult { success, error } = self.store.set_sync_enabled(enabled).await;
        if !success {
            let message = error.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            warn!(enabled, error = %message, "Sync toggle failed");
            *self.last_error.write() = Some(message);
        }
        success
    }

    /// Refresh the quota snapshot, only while sync is enabled.
    pub async fn refresh_quota_info(&self) -> Result<(), StorageError> {
        if self.sync_enabled() {
            self.store.refresh_quota().await?;
        }
        Ok(())
    }
}
