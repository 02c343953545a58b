// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Split Store
//!
//! Key-value storage for browser extensions that splits data between the
//! host's device-local area and its quota-limited cross-device sync area.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SplitStore (facade)                    │
//! │  • set_value / get_value / delete_value                    │
//! │  • set_sync_enabled → migration, refresh_quota             │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │   KeyRouter    │  │ MigrationEngine  │  │  QuotaMonitor    │
//! │ key → area     │  │ guard, then copy │  │ usage snapshot   │
//! └────────────────┘  └──────────────────┘  └──────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌─────────────────────────────┐   ┌─────────────────────────────┐
//! │   local StorageArea         │   │   sync StorageArea          │
//! │  • unlimited, this device   │   │  • 100 KB / 8 KB / 512 items│
//! │  • holds the sync flag      │   │  • follows the user         │
//! └─────────────────────────────┘   └─────────────────────────────┘
//! ```
//!
//! While sync is off every key lives in the local area. Turning it on copies
//! the keys whose prefix is syncable into the sync area, but only after the
//! quota guard accepts the whole batch. Turning it off copies them back.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use split_store::{MemoryArea, SplitStore, SplitStoreConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), split_store::StorageError> {
//! let config = SplitStoreConfig::default();
//! let local = Arc::new(MemoryArea::new());
//! let sync = Arc::new(MemoryArea::sync_for(config.host));
//! let store = SplitStore::open(config, local, sync).await?;
//!
//! store.set_value("trade-history", &vec![1, 2, 3], Some("Standard")).await?;
//!
//! let result = store.set_sync_enabled(true).await;
//! if !result.success {
//!     eprintln!("sync not enabled: {}", result.error.unwrap_or_default());
//! }
//! println!("sync usage: {}", store.formatted_quota_usage());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`store`]: the [`SplitStore`] facade
//! - [`routing`]: key formatting and area selection
//! - [`payload`]: value envelope with read-time expiration
//! - [`quota`]: quota guard and byte formatting
//! - [`migration`]: moving syncable keys between areas
//! - [`monitor`]: sync usage snapshot
//! - [`settings`]: controller for a settings view
//! - [`storage`]: the storage area capability and an in-memory area

pub mod config;
pub mod storage;
pub mod routing;
pub mod payload;
pub mod quota;
pub mod migration;
pub mod monitor;
pub mod store;
pub mod settings;
pub mod metrics;

pub use config::{HostFamily, SplitStoreConfig};
pub use storage::traits::{Keys, StorageArea, StorageError};
pub use storage::memory::MemoryArea;
pub use routing::{format_key, Backend, KeyRouter, DEFAULT_SYNCABLE_PREFIXES};
pub use payload::Payload;
pub use quota::{format_bytes, QuotaError, QuotaLimits};
pub use migration::{Direction, MigrationEngine, MigrationError, MigrationReport};
pub use monitor::{QuotaMonitor, QuotaSnapshot};
pub use store::{SplitStore, SyncResult};
pub use settings::SyncSettings;
