// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Quota guard for writes into the sync area.
//!
//! The sync area enforces three hard limits (total bytes, bytes per item and
//! item count). Before a batch is written, both checks here must pass:
//!
//! 1. **Aggregate**: the whole batch, serialized as one JSON object, fits in
//!    the total quota.
//! 2. **Per item**: every `{key: payload}` pair fits in the per-item quota.
//!
//! Sizes are UTF-8 byte lengths of the JSON text, which is what the host
//! measures.
//!
//! # Example
//!
//! ```
//! use split_store::quota::{format_bytes, QuotaLimits};
//!
//! let limits = QuotaLimits::sync_default();
//! assert_eq!(format_bytes(limits.total_bytes), "100.0 KB");
//! assert_eq!(format_bytes(500), "500 B");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Quota constants reported by a sync area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub total_bytes: u64,
    pub bytes_per_item: u64,
    pub max_items: u64,
}

impl QuotaLimits {
    /// The limits Chrome and Firefox both publish for `storage.sync`.
    #[must_use]
    pub const fn sync_default() -> Self {
        Self {
            total_bytes: 102_400,
            bytes_per_item: 8_192,
            max_items: 512,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    #[error("Data size ({}) exceeds sync quota ({})", human(.size), human(.limit))]
    TotalExceeded { size: u64, limit: u64 },
    #[error("Item \"{key}\" ({}) exceeds per-item limit ({})", human(.size), human(.limit))]
    ItemExceeded { key: String, size: u64, limit: u64 },
}

fn human(bytes: &u64) -> String {
    format_bytes(*bytes)
}

/// Byte length of the compact JSON text of a `{key: value, ...}` object.
///
/// Equivalent to `serde_json::to_string(batch)?.len()`, without building the
/// whole string.
#[must_use]
pub fn batch_size(batch: &BTreeMap<String, Value>) -> u64 {
    let entries: usize = batch.iter().map(|(key, value)| entry_len(key, value)).sum();
    let commas = batch.len().saturating_sub(1);
    (2 + entries + commas) as u64
}

/// Size of a single `{key: payload}` entry.
#[must_use]
pub fn item_size(key: &str, payload: &Value) -> u64 {
    (2 + entry_len(key, payload)) as u64
}

// `"key":value`
fn entry_len(key: &str, value: &Value) -> usize {
    Value::from(key).to_string().len() + 1 + value.to_string().len()
}

/// Aggregate check over the whole candidate batch.
pub fn check_total(batch: &BTreeMap<String, Value>, limits: &QuotaLimits) -> Result<(), QuotaError> {
    let size = batch_size(batch);
    if size > limits.total_bytes {
        return Err(QuotaError::TotalExceeded { size, limit: limits.total_bytes });
    }
    Ok(())
}

/// Per-item check. Stops at the first key over the limit.
pub fn check_items(batch: &BTreeMap<String, Value>, limits: &QuotaLimits) -> Result<(), QuotaError> {
    for (key, payload) in batch {
        let size = item_size(key, payload);
        if size > limits.bytes_per_item {
            return Err(QuotaError::ItemExceeded {
                key: key.clone(),
                size,
                limit: limits.bytes_per_item,
            });
        }
    }
    Ok(())
}

/// Run the aggregate check, then the per-item check. Both always run before
/// the caller writes anything.
pub fn validate(batch: &BTreeMap<String, Value>, limits: &QuotaLimits) -> Result<(), QuotaError> {
    check_total(batch, limits).inspect_err(|_| crate::metrics::record_quota_rejection("total"))?;
    check_items(batch, limits).inspect_err(|_| crate::metrics::record_quota_rejection("item"))?;
    Ok(())
}

/// Render a byte count as `B` below 1024, otherwise `KB` with one decimal.
///
/// Half-way tenths round up (1280 B is `1.3 KB`). There is no `MB` step;
/// sync quotas are far below it.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    format!("{} KB", format_ratio(u128::from(bytes), 1024))
}

/// `numerator / denominator` with one decimal, half-way tenths rounded up.
///
/// Integer arithmetic only, so exact halves never round to even.
pub(crate) fn format_ratio(numerator: u128, denominator: u128) -> String {
    if denominator == 0 {
        return "0.0".to_string();
    }
    let tenths = (numerator * 20 + denominator) / (denominator * 2);
    format!("{}.{}", tenths / 10, tenths % 10)
}
