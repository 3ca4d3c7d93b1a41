//! Core domain types for CORRAL.

pub mod node;
pub mod pool;
pub mod volume;

// Re-exports
pub use node::NodeInfo;
pub use pool::StoragePool;
pub use volume::{
    is_snapshot_name, ContentType, StorageVolume, VolumeRecord, VolumeSnapshot, VolumeType,
    SNAPSHOT_DELIMITER,
};
