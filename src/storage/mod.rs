// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage area capability and the in-memory implementation.

pub mod memory;
pub mod traits;

pub use memory::MemoryArea;
pub use traits::{Keys, StorageArea, StorageError};
