// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync area usage monitor.
//!
//! Keeps the latest [`QuotaSnapshot`] of the sync area. The snapshot is a
//! read model only: every refresh replaces it wholesale and nothing ever
//! decides a write from it.
//!
//! # Example
//!
//! ```
//! use split_store::monitor::QuotaSnapshot;
//! use split_store::quota::QuotaLimits;
//!
//! let snapshot = QuotaSnapshot::new(51_200, 10, &QuotaLimits::sync_default());
//! assert_eq!(snapshot.formatted_usage(), "50.0 KB / 100.0 KB (50.0%)");
//! assert!(!snapshot.is_near_quota);
//! ```

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::quota::{format_bytes, format_ratio, QuotaLimits};
use crate::storage::traits::{Keys, StorageArea, StorageError};

/// Share of the byte quota at which usage counts as near the limit.
pub const QUOTA_WARNING_THRESHOLD: f64 = 0.8;

/// Share of the item limit at which the item count counts as near the limit.
pub const ITEM_WARNING_THRESHOLD: f64 = 0.9;

/// Usage of the sync area at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    pub bytes_used: u64,
    pub total_quota: u64,
    pub percent_used: f64,
    pub item_count: u64,
    pub max_items: u64,
    pub is_near_quota: bool,
    pub is_near_item_limit: bool,
}

impl QuotaSnapshot {
    #[must_use]
    pub fn new(bytes_used: u64, item_count: u64, limits: &QuotaLimits) -> Self {
        let total = limits.total_bytes as f64;
        let percent_used = if limits.total_bytes == 0 {
            0.0
        } else {
            bytes_used as f64 / total * 100.0
        };

        Self {
            bytes_used,
            total_quota: limits.total_bytes,
            percent_used,
            item_count,
            max_items: limits.max_items,
            is_near_quota: bytes_used as f64 >= total * QUOTA_WARNING_THRESHOLD,
            is_near_item_limit: item_count as f64 >= limits.max_items as f64 * ITEM_WARNING_THRESHOLD,
        }
    }

    /// `"{used} / {total} ({percent}%)"`, every figure rounded half-up to
    /// one decimal.
    #[must_use]
    pub fn formatted_usage(&self) -> String {
        format!(
            "{} / {} ({}%)",
            format_bytes(self.bytes_used),
            format_bytes(self.total_quota),
            format_ratio(u128::from(self.bytes_used) * 100, u128::from(self.total_quota))
        )
    }

    /// Either warning flag is raised.
    #[must_use]
    pub fn needs_warning(&self) -> bool {
        self.is_near_quota || self.is_near_item_limit
    }
}

/// Holds the cached snapshot and knows how to rebuild it.
#[derive(Debug)]
pub struct QuotaMonitor {
    limits: QuotaLimits,
    snapshot: RwLock<Option<QuotaSnapshot>>,
}

impl QuotaMonitor {
    #[must_use]
    pub fn new(limits: QuotaLimits) -> Self {
        Self {
            limits,
            snapshot: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &QuotaLimits {
        &self.limits
    }

    /// Query the sync area and replace the cached snapshot.
    ///
    /// Bytes are measured over everything stored in the area, not only the
    /// syncable keys.
    pub async fn refresh(&self, sync: &dyn StorageArea) -> Result<QuotaSnapshot, StorageError> {
        let bytes_used = sync.bytes_in_use(Keys::All).await?;
        let item_count = sync.keys().await?.len() as u64;

        let snapshot = QuotaSnapshot::new(bytes_used, item_count, &self.limits);
        debug!(
            bytes_used,
            item_count,
            percent = snapshot.percent_used,
            "Sync quota snapshot refreshed"
        );
        crate::metrics::set_quota_snapshot(&snapshot);

        *self.snapshot.write() = Some(snapshot.clone());
        Ok(snapshot)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<QuotaSnapshot> {
        self.snapshot.read().clone()
    }

    /// Forget the cached snapshot.
    pub fn clear(&self) {
        *self.snapshot.write() = None;
    }

    /// Formatted usage, or an empty string before the first refresh.
    #[must_use]
    pub fn formatted_usage(&self) -> String {
        self.snapshot
            .read()
            .as_ref()
            .map(QuotaSnapshot::formatted_usage)
            .unwrap_or_default()
    }
}
