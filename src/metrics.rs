// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for split-store.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application chooses the recorder/exporter.
//!
//! # Metric Naming Convention
//! - `split_store_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_bytes` suffix for size gauges
//!
//! # Labels
//! - `backend`: local, sync
//! - `operation`: get, set, delete
//! - `status`: success, error
//! - `direction`: to_sync, to_local

use metrics::{counter, gauge};

use crate::monitor::QuotaSnapshot;
use crate::routing::Backend;

/// Record a facade read/write against one area
pub fn record_operation(backend: Backend, operation: &str, status: &str) {
    counter!(
        "split_store_operations_total",
        "backend" => backend.as_str(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a batch refused by the quota guard (`check` = total | item)
pub fn record_quota_rejection(check: &str) {
    counter!(
        "split_store_quota_rejections_total",
        "check" => check.to_string()
    )
    .increment(1);
}

/// Record the outcome of a migration run
pub fn record_migration(direction: &str, status: &str) {
    counter!(
        "split_store_migrations_total",
        "direction" => direction.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record items copied by a migration
pub fn record_items_migrated(direction: &str, count: usize) {
    counter!(
        "split_store_migrated_items_total",
        "direction" => direction.to_string()
    )
    .increment(count as u64);
}

/// Set the sync flag gauge (1 = enabled)
pub fn set_sync_enabled(enabled: bool) {
    gauge!("split_store_sync_enabled").set(if enabled { 1.0 } else { 0.0 });
}

/// Publish a fresh quota snapshot
pub fn set_quota_snapshot(snapshot: &QuotaSnapshot) {
    gauge!("split_store_sync_used_bytes").set(snapshot.bytes_used as f64);
    gauge!("split_store_sync_items").set(snapshot.item_count as f64);
    gauge!("split_store_sync_quota_percent").set(snapshot.percent_used);
}
