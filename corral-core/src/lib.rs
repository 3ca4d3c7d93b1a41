//! CORRAL Core Library
//!
//! Shared types and the clustered state directory for the CORRAL
//! container/VM fleet manager. The centrepiece is the storage-volume
//! directory: it records which pool, project and cluster member every
//! storage volume belongs to, and reconciles local (one-member) and
//! remote (shared) storage drivers behind one logical volume identity.

pub mod config;
pub mod directory;
pub mod error;
pub mod observability;
pub mod types;

// Re-export commonly used items
pub use config::Config;
pub use directory::{
    DriverClass, RemoteDriverRegistry, Resolution, StaticRemoteDrivers, VolumeDirectory,
    VolumeLocation,
};
pub use error::{CorralError, Result};
pub use types::{
    is_snapshot_name, ContentType, NodeInfo, StoragePool, StorageVolume, VolumeRecord,
    VolumeSnapshot, VolumeType, SNAPSHOT_DELIMITER,
};
