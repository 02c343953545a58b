// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::quota::QuotaLimits;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Key selection for `get` / `bytes_in_use`.
#[derive(Debug, Clone, Copy)]
pub enum Keys<'a> {
    /// Every key stored in the area
    All,
    /// Only these keys (missing ones are simply absent from the result)
    Only(&'a [String]),
}

impl Keys<'_> {
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Keys::All => true,
            Keys::Only(keys) => keys.iter().any(|k| k == key),
        }
    }
}

/// One storage area of the host (`local` or `sync`).
///
/// Values are opaque JSON documents. Implementations must be cheap to share
/// behind an `Arc` and usable from any task.
#[async_trait]
pub trait StorageArea: Send + Sync {
    async fn get(&self, keys: Keys<'_>) -> Result<BTreeMap<String, Value>, StorageError>;
    async fn set(&self, items: BTreeMap<String, Value>) -> Result<(), StorageError>;

    /// Remove keys. Removing an empty list or unknown keys is not an error.
    async fn remove(&self, keys: &[String]) -> Result<(), StorageError>;

    async fn bytes_in_use(&self, keys: Keys<'_>) -> Result<u64, StorageError>;

    /// Quota constants reported by the area. Only the sync area has them.
    fn quota_limits(&self) -> Option<QuotaLimits> {
        None
    }

    /// Enumerate every stored key.
    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.get(Keys::All).await?.into_keys().collect())
    }

    /// Read a single key. Default implementation goes through `get`.
    async fn get_one(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let wanted = [key.to_string()];
        let mut found = self.get(Keys::Only(&wanted)).await?;
        Ok(found.remove(key))
    }

    /// Write a single key. Default implementation goes through `set`.
    async fn set_one(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut items = BTreeMap::new();
        items.insert(key.to_string(), value);
        self.set(items).await
    }
}
