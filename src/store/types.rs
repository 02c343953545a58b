// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the split store facade.

use serde::Serialize;

/// Outcome of a sync toggle.
///
/// Toggling never returns an `Err`: every failure, from quota refusal to a
/// rejected backend write, is folded into `success: false` with a message
/// fit for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    #[must_use]
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

impl std::fmt::Display for SyncResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.success, &self.error) {
            (true, _) => write!(f, "Success"),
            (false, Some(error)) => write!(f, "Failed({})", error),
            (false, None) => write!(f, "Failed"),
        }
    }
}
