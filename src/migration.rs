// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Migration of syncable keys between the local and sync areas.
//!
//! Runs when the sync flag flips:
//!
//! ```text
//! enable:   local ──(enumerate, filter, read)──► quota guard ──(write one by one)──► sync
//! disable:  sync  ──(enumerate, filter, read)──────────────────(write one by one)──► local
//! ```
//!
//! # Guarantees
//!
//! - Towards sync, both quota checks run over the full candidate set before
//!   the first write. A refused batch leaves the sync area untouched.
//! - Reads and writes are awaited one at a time, so a failure always names
//!   exactly one key.
//! - Writes are best effort: keys already copied before a failed write stay
//!   in the destination. There is no rollback.
//! - The source area is never cleaned up. After a successful migration each
//!   key exists in both areas.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::quota::{self, QuotaError, QuotaLimits};
use crate::routing::{Backend, KeyRouter};
use crate::storage::traits::{StorageArea, StorageError};

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error(transparent)]
    Quota(#[from] QuotaError),
    #[error("Migration failed: {0}")]
    Read(StorageError),
    #[error("Migration failed: {source}")]
    Write {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl MigrationError {
    /// The key whose write was rejected, if that is what failed.
    #[must_use]
    pub fn failed_key(&self) -> Option<&str> {
        match self {
            Self::Write { key, .. } => Some(key),
            Self::Quota(QuotaError::ItemExceeded { key, .. }) => Some(key),
            _ => None,
        }
    }
}

/// Which way keys are moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToSync,
    ToLocal,
}

impl Direction {
    #[must_use]
    pub fn source(&self) -> Backend {
        match self {
            Self::ToSync => Backend::Local,
            Self::ToLocal => Backend::Sync,
        }
    }

    #[must_use]
    pub fn destination(&self) -> Backend {
        match self {
            Self::ToSync => Backend::Sync,
            Self::ToLocal => Backend::Local,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToSync => "to_sync",
            Self::ToLocal => "to_local",
        }
    }
}

/// Summary of a completed migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub direction: Direction,
    /// Syncable keys found in the source area
    pub candidates: usize,
    /// Keys written to the destination area
    pub migrated: usize,
}

/// Moves the syncable subset of keys between two areas.
pub struct MigrationEngine<'a> {
    router: &'a KeyRouter,
    local: &'a dyn StorageArea,
    sync: &'a dyn StorageArea,
    limits: &'a QuotaLimits,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(
        router: &'a KeyRouter,
        local: &'a dyn StorageArea,
        sync: &'a dyn StorageArea,
        limits: &'a QuotaLimits,
    ) -> Self {
        Self { router, local, sync, limits }
    }

    pub async fn run(&self, direction: Direction) -> Result<MigrationReport, MigrationError> {
        debug!(from = %direction.source(), to = %direction.destination(), "Starting migration");
        let result = match direction {
            Direction::ToSync => self.to_sync().await,
            Direction::ToLocal => self.to_local().await,
        };
        match &result {
            Ok(report) => {
                crate::metrics::record_migration(direction.as_str(), "success");
                crate::metrics::record_items_migrated(direction.as_str(), report.migrated);
            }
            Err(_) => crate::metrics::record_migration(direction.as_str(), "error"),
        }
        result
    }

    /// Copy syncable local keys into the sync area after the quota guard
    /// accepts the whole batch.
    #[tracing::instrument(skip(self))]
    pub async fn to_sync(&self) -> Result<MigrationReport, MigrationError> {
        let direction = Direction::ToSync;
        let (candidates, batch) = self.collect(self.area(direction.source())).await?;

        if let Err(e) = quota::validate(&batch, self.limits) {
            warn!(error = %e, candidates, "Quota guard refused migration to sync");
            return Err(e.into());
        }

        let migrated = self.copy(batch, self.area(direction.destination())).await?;
        info!(candidates, migrated, "Migrated syncable keys to sync area");
        Ok(MigrationReport { direction, candidates, migrated })
    }

    /// Copy syncable sync keys back into the local area. No quota applies.
    #[tracing::instrument(skip(self))]
    pub async fn to_local(&self) -> Result<MigrationReport, MigrationError> {
        let direction = Direction::ToLocal;
        let (candidates, batch) = self.collect(self.area(direction.source())).await?;
        let migrated = self.copy(batch, self.area(direction.destination())).await?;
        info!(candidates, migrated, "Migrated syncable keys to local area");
        Ok(MigrationReport { direction, candidates, migrated })
    }

    fn area(&self, backend: Backend) -> &'a dyn StorageArea {
        match backend {
            Backend::Local => self.local,
            Backend::Sync => self.sync,
        }
    }

    /// Enumerate `source`, keep syncable keys and read each one.
    ///
    /// Keys that vanished or hold `null` between enumeration and read are
    /// skipped.
    async fn collect(&self, source: &dyn StorageArea) -> Result<(usize, BTreeMap<String, Value>), MigrationError> {
        let keys = source.keys().await.map_err(MigrationError::Read)?;
        let syncable = self.router.syncable(&keys);

        let mut batch = BTreeMap::new();
        for key in &syncable {
            match source.get_one(key).await.map_err(MigrationError::Read)? {
                Some(Value::Null) | None => debug!(key = %key, "Skipping absent key"),
                Some(value) => {
                    batch.insert(key.clone(), value);
                }
            }
        }
        Ok((syncable.len(), batch))
    }

    async fn copy(&self, batch: BTreeMap<String, Value>, destination: &dyn StorageArea) -> Result<usize, MigrationError> {
        let mut written = 0;
        for (key, value) in batch {
            if let Err(source) = destination.set_one(&key, value).await {
                warn!(key = %key, written, error = %source, "Migration write rejected, leaving earlier writes in place");
                return Err(MigrationError::Write { key, source });
            }
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryArea;
    use serde_json::json;

    fn payload(value: Value) -> Value {
        json!({"value": value, "expiresAt": null})
    }

    struct Fixture {
        router: KeyRouter,
        local: MemoryArea,
        sync: MemoryArea,
        limits: QuotaLimits,
    }

    impl Fixture {
        fn new(limits: QuotaLimits) -> Self {
            Self {
                router: KeyRouter::default(),
                local: MemoryArea::new(),
                sync: MemoryArea::with_limits(limits),
                limits,
            }
        }

        fn engine(&self) -> MigrationEngine<'_> {
            MigrationEngine::new(&self.router, &self.local, &self.sync, &self.limits)
        }
    }

    #[tokio::test]
    async fn test_to_sync_copies_only_syncable_keys() {
        let fx = Fixture::new(QuotaLimits::sync_default());
        fx.local.set_one("bookmark-folders", payload(json!([1]))).await.unwrap();
        fx.local.set_one("trade-history--standard", payload(json!([2]))).await.unwrap();
        fx.local.set_one("item-cache", payload(json!("big"))).await.unwrap();

        let report = fx.engine().run(Direction::ToSync).await.unwrap();

        assert_eq!(report, MigrationReport { direction: Direction::ToSync, candidates: 2, migrated: 2 });
        assert!(fx.sync.contains("bookmark-folders"));
        assert!(fx.sync.contains("trade-history--standard"));
        assert!(!fx.sync.contains("item-cache"));
        // Source copies stay behind
        assert_eq!(fx.local.len(), 3);
    }

    #[tokio::test]
    async fn test_to_sync_refused_by_total_quota_writes_nothing() {
        let fx = Fixture::new(QuotaLimits { total_bytes: 40, bytes_per_item: 8_192, max_items: 512 });
        fx.local.set_one("bookmark-folders", payload(json!("a fairly long folder list"))).await.unwrap();

        let err = fx.engine().run(Direction::ToSync).await.unwrap_err();

        assert!(matches!(err, MigrationError::Quota(QuotaError::TotalExceeded { .. })));
        assert!(err.to_string().starts_with("Data size ("));
        assert!(fx.sync.is_empty());
    }

    #[tokio::test]
    async fn test_to_sync_refused_by_item_quota_names_key() {
        let fx = Fixture::new(QuotaLimits { total_bytes: 102_400, bytes_per_item: 60, max_items: 512 });
        fx.local.set_one("bookmark-folders", payload(json!("small"))).await.unwrap();
        fx.local.set_one("trade-history", payload(json!("x".repeat(100)))).await.unwrap();

        let err = fx.engine().run(Direction::ToSync).await.unwrap_err();

        assert_eq!(err.failed_key(), Some("trade-history"));
        assert!(err.to_string().contains("\"trade-history\""));
        assert!(fx.sync.is_empty());
    }

    #[tokio::test]
    async fn test_to_sync_rejected_write_keeps_earlier_writes() {
        // The area's own item cap (2) is lower than what the guard checks.
        let limits = QuotaLimits { total_bytes: 102_400, bytes_per_item: 8_192, max_items: 2 };
        let fx = Fixture::new(limits);
        for key in ["bookmark-folders", "bookmark-trades--a", "trade-history"] {
            fx.local.set_one(key, payload(json!(key))).await.unwrap();
        }

        let err = fx.engine().run(Direction::ToSync).await.unwrap_err();

        assert!(err.to_string().starts_with("Migration failed: "));
        assert_eq!(err.failed_key(), Some("trade-history"));
        assert_eq!(fx.sync.len(), 2);
    }

    #[tokio::test]
    async fn test_to_local_copies_back_without_quota() {
        let fx = Fixture::new(QuotaLimits::sync_default());
        fx.sync.set_one("bookmark-folders", payload(json!([1, 2]))).await.unwrap();
        fx.sync.set_one("foreign-key", json!(1)).await.unwrap();

        let report = fx.engine().run(Direction::ToLocal).await.unwrap();

        assert_eq!(report.migrated, 1);
        assert_eq!(fx.local.peek("bookmark-folders"), Some(payload(json!([1, 2]))));
        assert!(!fx.local.contains("foreign-key"));
        assert!(fx.sync.contains("bookmark-folders"));
    }

    #[tokio::test]
    async fn test_null_values_are_skipped() {
        let fx = Fixture::new(QuotaLimits::sync_default());
        fx.local.set_one("bookmark-folders", Value::Null).await.unwrap();

        let report = fx.engine().run(Direction::ToSync).await.unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.migrated, 0);
        assert!(fx.sync.is_empty());
    }

    #[test]
    fn test_direction() {
        assert_eq!(Direction::ToSync.source(), Backend::Local);
        assert_eq!(Direction::ToSync.destination(), Backend::Sync);
        assert_eq!(Direction::ToLocal.source(), Backend::Sync);
        assert_eq!(Direction::ToLocal.as_str(), "to_local");
    }
}
