//! Storage volume domain types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::CorralError;

/// Separator between a volume name and a snapshot's short name.
///
/// A qualified snapshot name is `<volume>/<snapshot>`; primary volume names
/// must never contain it.
pub const SNAPSHOT_DELIMITER: &str = "/";

/// Returns true if the given volume name refers to a snapshot.
pub fn is_snapshot_name(name: &str) -> bool {
    name.contains(SNAPSHOT_DELIMITER)
}

/// What a storage volume is used for. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeType {
    Container,
    VirtualMachine,
    Image,
    Custom,
}

impl VolumeType {
    /// Convert to the string representation stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::VirtualMachine => "virtual-machine",
            Self::Image => "image",
            Self::Custom => "custom",
        }
    }

    /// Parse from the stored string representation.
    pub fn parse(s: &str) -> Result<Self, CorralError> {
        match s {
            "container" => Ok(Self::Container),
            "virtual-machine" => Ok(Self::VirtualMachine),
            "image" => Ok(Self::Image),
            "custom" => Ok(Self::Custom),
            _ => Err(CorralError::InvalidVolumeType { value: s.to_string() }),
        }
    }
}

impl std::fmt::Display for VolumeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the volume carries a filesystem or a raw block device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Filesystem,
    Block,
}

impl ContentType {
    /// Convert to the string representation stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Block => "block",
        }
    }

    /// Parse from the stored string representation.
    pub fn parse(s: &str) -> Result<Self, CorralError> {
        match s {
            "filesystem" => Ok(Self::Filesystem),
            "block" => Ok(Self::Block),
            _ => Err(CorralError::InvalidVolumeType { value: s.to_string() }),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The logical view of a storage volume handed to API consumers.
///
/// `location` is the name of the cluster member hosting the volume, or empty
/// when the volume lives on shared storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageVolume {
    pub name: String,
    pub volume_type: VolumeType,
    pub description: String,
    pub config: HashMap<String, String>,
    pub location: String,
    pub content_type: ContentType,
}

/// A storage volume record joined to its pool and project.
#[derive(Debug, Clone)]
pub struct VolumeRecord {
    pub id: i64,
    pub name: String,
    pub volume_type: VolumeType,
    pub pool_name: String,
    pub project: String,
    /// None for volumes on shared storage without an owning member.
    pub node_id: Option<i64>,
    pub description: String,
    pub config: HashMap<String, String>,
}

/// A snapshot of a storage volume.
///
/// `name` is the qualified `<volume>/<snapshot>` form. The id is allocated in
/// creation order and never reused, so sorting by id reproduces the order the
/// snapshots were taken in.
#[derive(Debug, Clone)]
pub struct VolumeSnapshot {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Unix seconds, None when the snapshot never expires.
    pub expiry: Option<i64>,
    pub content_type: ContentType,
    pub config: HashMap<String, String>,
}
