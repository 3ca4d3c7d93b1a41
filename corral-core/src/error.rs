//! Error types for CORRAL.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CORRAL operations.
pub type Result<T> = std::result::Result<T, CorralError>;

/// Main error type for CORRAL.
#[derive(Error, Debug)]
pub enum CorralError {
    // Directory lookup errors
    #[error("Storage pool not found: {pool}")]
    PoolNotFound { pool: String },

    #[error("Storage pool volume not found")]
    VolumeNotFound,

    #[error("Project not found: {name}")]
    ProjectNotFound { name: String },

    /// The volume exists on shared storage without a single owning cluster
    /// member. This is an expected condition for remote-driver pools, not a
    /// failure; callers needing a member target must decide their own policy.
    #[error("Volume is not associated with a single cluster member")]
    NoClusterMember,

    // Integrity errors
    #[error("Database integrity violation: {reason}")]
    Integrity { reason: String },

    // Argument errors
    #[error("Invalid volume name {name:?}: {reason}")]
    InvalidVolumeName { name: String, reason: String },

    #[error("Invalid storage volume type: {value}")]
    InvalidVolumeType { value: String },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database migration failed: {reason}")]
    MigrationFailed { reason: String },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O error at {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CorralError {
    /// True when the error is the not-found condition that per-member listing
    /// operations are allowed to skip.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::VolumeNotFound | Self::PoolNotFound { .. } | Self::ProjectNotFound { .. }
        )
    }
}
