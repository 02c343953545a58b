// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Value API: get, set and delete through the router.
//!
//! Every key is formatted first (`key--league`, lower-cased) and the stored
//! form is what gets routed. Backend failures propagate to the caller
//! unchanged.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::payload::{now_millis, Payload};
use crate::routing::{format_key, Backend};
use crate::storage::traits::StorageError;

use super::SplitStore;

impl SplitStore {
    /// Store a value that never expires.
    pub async fn set_value<T>(&self, key: &str, value: &T, league: Option<&str>) -> Result<(), StorageError>
    where
        T: Serialize + ?Sized,
    {
        let payload = Payload::from_serializable(value, None)?;
        self.write(&format_key(key, league), &payload).await
    }

    /// Store a value that reads as absent after `expires_at` (epoch millis).
    pub async fn set_ephemeral_value<T>(
        &self,
        key: &str,
        value: &T,
        expires_at: i64,
        league: Option<&str>,
    ) -> Result<(), StorageError>
    where
        T: Serialize + ?Sized,
    {
        let payload = Payload::from_serializable(value, Some(expires_at))?;
        self.write(&format_key(key, league), &payload).await
    }

    /// Read a value. Missing and expired values are both `Ok(None)`.
    pub async fn get_value<T>(&self, key: &str, league: Option<&str>) -> Result<Option<T>, StorageError>
    where
        T: DeserializeOwned,
    {
        match self.read(&format_key(key, league)).await? {
            Some(payload) => payload.into_value(now_millis()),
            None => Ok(None),
        }
    }

    pub async fn delete_value(&self, key: &str, league: Option<&str>) -> Result<(), StorageError> {
        self.remove(vec![format_key(key, league)]).await
    }

    /// Delete several keys sharing the same league, one `remove` per area.
    pub async fn delete_values(&self, keys: &[&str], league: Option<&str>) -> Result<(), StorageError> {
        self.remove(keys.iter().map(|key| format_key(key, league)).collect()).await
    }

    async fn read(&self, key: &str) -> Result<Option<Payload>, StorageError> {
        let backend = self.router.route(key, self.sync_enabled());
        let raw = self
            .area(backend)
            .get_one(key)
            .await
            .inspect_err(|_| crate::metrics::record_operation(backend, "get", "error"))?;
        crate::metrics::record_operation(backend, "get", "success");

        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => Payload::from_stored(raw).map(Some),
        }
    }

    async fn write(&self, key: &str, payload: &Payload) -> Result<(), StorageError> {
        let backend = self.router.route(key, self.sync_enabled());
        let stored = payload.to_stored()?;

        debug!(key = %key, backend = %backend, ephemeral = payload.expires_at.is_some(), "Writing value");
        self.area(backend)
            .set_one(key, stored)
            .await
            .inspect_err(|_| crate::metrics::record_operation(backend, "set", "error"))?;
        crate::metrics::record_operation(backend, "set", "success");
        Ok(())
    }

    async fn remove(&self, keys: Vec<String>) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }

        let sync_enabled = self.sync_enabled();
        let (sync_keys, local_keys): (Vec<String>, Vec<String>) = keys
            .into_iter()
            .partition(|key| self.router.route(key, sync_enabled) == Backend::Sync);

        for (backend, keys) in [(Backend::Local, local_keys), (Backend::Sync, sync_keys)] {
            if keys.is_empty() {
                continue;
            }
            debug!(backend = %backend, count = keys.len(), "Removing keys");
            self.area(backend)
                .remove(&keys)
                .await
                .inspect_err(|_| crate::metrics::record_operation(backend, "delete", "error"))?;
            crate::metrics::record_operation(backend, "delete", "success");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;
    use serde_json::json;

    use crate::config::SplitStoreConfig;
    use crate::quota::QuotaLimits;
    use crate::storage::memory::MemoryArea;
    use crate::storage::traits::StorageArea;

    use super::*;

    async fn store(sync_enabled: bool) -> (SplitStore, Arc<MemoryArea>, Arc<MemoryArea>) {
        let local = Arc::new(MemoryArea::new());
        let sync = Arc::new(MemoryArea::with_limits(QuotaLimits::sync_default()));
        if sync_enabled {
            local.set_one("bt-sync-enabled", json!(true)).await.unwrap();
        }
        let store = SplitStore::open(SplitStoreConfig::default(), local.clone(), sync.clone())
            .await
            .unwrap();
        (store, local, sync)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Folder {
        id: String,
        title: String,
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let (store, local, _) = store(false).await;
        let folders = vec![Folder { id: "1".into(), title: "Maps".into() }];

        store.set_value("bookmark-folders", &folders, None).await.unwrap();

        let read: Option<Vec<Folder>> = store.get_value("bookmark-folders", None).await.unwrap();
        assert_eq!(read.unwrap(), folders);
        assert_eq!(
            local.peek("bookmark-folders").unwrap(),
            json!({"value": [{"id": "1", "title": "Maps"}], "expiresAt": null})
        );
    }

    #[tokio::test]
    async fn test_missing_value_is_none() {
        let (store, _, _) = store(false).await;
        let read: Option<String> = store.get_value("nothing", None).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_league_namespacing_is_lowercased() {
        let (store, local, _) = store(false).await;
        store.set_value("Chaos-Ratios", &180, Some("Settlers")).await.unwrap();

        assert!(local.contains("chaos-ratios--settlers"));
        let read: Option<u32> = store.get_value("chaos-ratios", Some("SETTLERS")).await.unwrap();
        assert_eq!(read, Some(180));
    }

    #[tokio::test]
    async fn test_routes_syncable_keys_when_enabled() {
        let (store, local, sync) = store(true).await;

        store.set_value("bookmark-folders", &json!([]), None).await.unwrap();
        store.set_value("poe-ninja-chaos-ratios-cache", &json!({}), None).await.unwrap();

        assert!(sync.contains("bookmark-folders"));
        assert!(local.contains("poe-ninja-chaos-ratios-cache"));
        assert!(!sync.contains("poe-ninja-chaos-ratios-cache"));
    }

    #[tokio::test]
    async fn test_ephemeral_value_expires() {
        let (store, local, _) = store(false).await;

        store.set_ephemeral_value("fresh", "v", now_millis() + 60_000, None).await.unwrap();
        store.set_ephemeral_value("stale", "v", now_millis() - 1, None).await.unwrap();

        let fresh: Option<String> = store.get_value("fresh", None).await.unwrap();
        let stale: Option<String> = store.get_value("stale", None).await.unwrap();
        assert_eq!(fresh.as_deref(), Some("v"));
        assert!(stale.is_none());

        // Expiry is a read filter only; the entry is still stored
        assert!(local.contains("stale"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error() {
        let (store, local, _) = store(false).await;
        local.set_one("legacy", json!("raw string")).await.unwrap();

        let result: Result<Option<String>, _> = store.get_value("legacy", None).await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_delete_value() {
        let (store, local, _) = store(false).await;
        store.set_value("trade-history", &json!([1]), Some("std")).await.unwrap();

        store.delete_value("trade-history", Some("std")).await.unwrap();

        assert!(!local.contains("trade-history--std"));
        let read: Option<Value> = store.get_value("trade-history", Some("std")).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_delete_values_groups_by_area() {
        let (store, local, sync) = store(true).await;
        store.set_value("bookmark-folders", &1, None).await.unwrap();
        store.set_value("item-cache", &2, None).await.unwrap();

        store.delete_values(&["bookmark-folders", "item-cache", "never-written"], None).await.unwrap();

        assert!(!sync.contains("bookmark-folders"));
        assert!(!local.contains("item-cache"));
        // The flag lives in local and is untouched
        assert!(local.contains("bt-sync-enabled"));
    }

    #[tokio::test]
    async fn test_delete_values_empty_is_noop() {
        let (store, _, _) = store(false).await;
        store.delete_values(&[], None).await.unwrap();
    }

    #[tokio::test]
    async fn test_sync_quota_rejection_propagates() {
        let (store, _, sync) = store(true).await;
        let huge = "x".repeat(10_000);

        let err = store.set_value("trade-history", &huge, None).await.unwrap_err();
        assert!(err.to_string().contains("QUOTA_BYTES_PER_ITEM"));
        assert!(sync.is_empty());
    }
}
