//! Storage pool types.

use serde::{Deserialize, Serialize};

/// A storage pool row.
///
/// The driver string decides whether volumes on the pool are bound to one
/// cluster member or visible from all of them; that classification is derived
/// from the remote-driver registry, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoragePool {
    pub id: i64,
    pub name: String,
    pub driver: String,
}
