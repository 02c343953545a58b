// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::config::HostFamily;
use crate::quota::QuotaLimits;
use super::traits::{Keys, StorageArea, StorageError};

/// In-memory [`StorageArea`] mirroring the host's behaviour.
///
/// With limits set it rejects writes the way the host's sync area does, so
/// it can stand in for either area in tests and demos.
pub struct MemoryArea {
    data: DashMap<String, Value>,
    limits: Option<QuotaLimits>,
}

impl MemoryArea {
    /// Unlimited area, like the host's `local` storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            limits: None,
        }
    }

    /// Quota-limited area, like the host's `sync` storage.
    #[must_use]
    pub fn with_limits(limits: QuotaLimits) -> Self {
        Self {
            data: DashMap::new(),
            limits: Some(limits),
        }
    }

    /// Sync area with the limits published by `host`.
    #[must_use]
    pub fn sync_for(host: HostFamily) -> Self {
        Self::with_limits(host.sync_limits())
    }

    /// Get current item count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Direct read, bypassing the async trait.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|r| r.value().clone())
    }

    fn used_bytes(&self, keys: Keys<'_>) -> u64 {
        self.data
            .iter()
            .filter(|entry| keys.matches(entry.key()))
            .map(|entry| stored_item_bytes(entry.key(), entry.value()))
            .sum()
    }

    fn check_limits(&self, limits: &QuotaLimits, items: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        let mut total = self.used_bytes(Keys::All);
        let mut count = self.data.len() as u64;

        for (key, value) in items {
            let size = stored_item_bytes(key, value);
            if size > limits.bytes_per_item {
                return Err(StorageError::Backend("QUOTA_BYTES_PER_ITEM quota exceeded".into()));
            }
            match self.data.get(key) {
                Some(existing) => {
                    total = total - stored_item_bytes(key, existing.value()) + size;
                }
                None => {
                    total += size;
                    count += 1;
                }
            }
        }

        if total > limits.total_bytes {
            return Err(StorageError::Backend("QUOTA_BYTES quota exceeded".into()));
        }
        if count > limits.max_items {
            return Err(StorageError::Backend("MAX_ITEMS quota exceeded".into()));
        }
        Ok(())
    }
}

impl Default for MemoryArea {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes the host charges for one stored item: key length plus JSON value.
#[must_use]
pub fn stored_item_bytes(key: &str, value: &Value) -> u64 {
    (key.len() + value.to_string().len()) as u64
}

#[async_trait]
impl StorageArea for MemoryArea {
    async fn get(&self, keys: Keys<'_>) -> Result<BTreeMap<String, Value>, StorageError> {
        let found = match keys {
            Keys::All => self
                .data
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            Keys::Only(wanted) => wanted
                .iter()
                .filter_map(|key| self.data.get(key).map(|v| (key.clone(), v.value().clone())))
                .collect(),
        };
        Ok(found)
    }

    async fn set(&self, items: BTreeMap<String, Value>) -> Result<(), StorageError> {
        if let Some(limits) = &self.limits {
            self.check_limits(limits, &items)?;
        }
        for (key, value) in items {
            self.data.insert(key, value);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.data.remove(key);
        }
        Ok(())
    }

    async fn bytes_in_use(&self, keys: Keys<'_>) -> Result<u64, StorageError> {
        Ok(self.used_bytes(keys))
    }

    fn quota_limits(&self) -> Option<QuotaLimits> {
        self.limits
    }
}
