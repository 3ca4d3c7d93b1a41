//! Cluster member types.

use serde::{Deserialize, Serialize};

/// A cluster member as referenced by volume records.
///
/// Members are owned by the cluster membership layer; the volume directory
/// only references them by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: i64,
    pub name: String,
    pub address: String,
}
