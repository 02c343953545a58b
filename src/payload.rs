// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Stored value envelope.
//!
//! Every application value is wrapped in a [`Payload`] before it reaches a
//! storage area:
//!
//! ```text
//! {"value": <any JSON>, "expiresAt": <epoch millis> | null}
//! ```
//!
//! Expiration is applied only when reading. An expired payload stays in the
//! area until it is overwritten or deleted.
//!
//! # Example
//!
//! ```
//! use split_store::payload::Payload;
//! use serde_json::json;
//!
//! let payload = Payload::ephemeral(json!({"chaos": 180}), 1_000);
//! assert_eq!(payload.decode(1_000), Some(&json!({"chaos": 180})));
//! assert_eq!(payload.decode(1_001), None);
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::traits::StorageError;

/// Current wall clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub value: Value,
    /// Expiration timestamp (epoch millis). `None` never expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Payload {
    /// Wrap a value that never expires.
    #[must_use]
    pub fn persistent(value: Value) -> Self {
        Self::encode(value, None)
    }

    /// Wrap a value that expires at `expires_at` (epoch millis).
    #[must_use]
    pub fn ephemeral(value: Value, expires_at: i64) -> Self {
        Self::encode(value, Some(expires_at))
    }

    #[must_use]
    pub fn encode(value: Value, expires_at: Option<i64>) -> Self {
        Self { value, expires_at }
    }

    /// Serialize any value into a payload.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T, expires_at: Option<i64>) -> Result<Self, StorageError> {
        Ok(Self::encode(serde_json::to_value(value)?, expires_at))
    }

    /// Expired strictly after `expires_at`; equality still reads.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    /// The wrapped value, or `None` once expired.
    #[must_use]
    pub fn decode(&self, now: i64) -> Option<&Value> {
        if self.is_expired(now) {
            None
        } else {
            Some(&self.value)
        }
    }

    /// Owned variant of [`decode`](Self::decode) deserializing into `T`.
    pub fn into_value<T: DeserializeOwned>(self, now: i64) -> Result<Option<T>, StorageError> {
        if self.is_expired(now) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(self.value)?))
    }

    /// Parse the raw document read from an area.
    pub fn from_stored(raw: Value) -> Result<Self, StorageError> {
        Ok(serde_json::from_value(raw)?)
    }

    /// The raw document to hand to an area.
    pub fn to_stored(&self) -> Result<Value, StorageError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_persistent_never_expires() {
        let payload = Payload::persistent(json!("x"));
        assert!(payload.expires_at.is_none());
        assert_eq!(payload.decode(i64::MAX), Some(&json!("x")));
    }

    #[test]
    fn test_expiry_is_strictly_greater_than() {
        let payload = Payload::ephemeral(json!(1), 5_000);
        assert_eq!(payload.decode(4_999), Some(&json!(1)));
        assert_eq!(payload.decode(5_000), Some(&json!(1)));
        assert_eq!(payload.decode(5_001), None);
    }

    #[test]
    fn test_stored_shape() {
        let payload = Payload::ephemeral(json!({"a": 1}), 42);
        let stored = payload.to_stored().unwrap();
        assert_eq!(stored, json!({"value": {"a": 1}, "expiresAt": 42}));

        let persistent = Payload::persistent(json!([1])).to_stored().unwrap();
        assert_eq!(persistent, json!({"value": [1], "expiresAt": null}));
    }

    #[test]
    fn test_from_stored_accepts_missing_expiry() {
        let payload = Payload::from_stored(json!({"value": true})).unwrap();
        assert_eq!(payload, Payload::persistent(json!(true)));
    }

    #[test]
    fn test_from_stored_rejects_garbage() {
        let result = Payload::from_stored(json!("not an envelope"));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_into_value_typed() {
        #[derive(Debug, PartialEq, Deserialize, Serialize)]
        struct Folder {
            id: String,
            title: String,
        }

        let folder = Folder { id: "f1".into(), title: "Maps".into() };
        let payload = Payload::from_serializable(&folder, Some(100)).unwrap();

        assert_eq!(payload.clone().into_value::<Folder>(100).unwrap(), Some(folder));
        assert_eq!(payload.into_value::<Folder>(101).unwrap(), None);
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_millis() > 1_577_836_800_000);
    }
}
