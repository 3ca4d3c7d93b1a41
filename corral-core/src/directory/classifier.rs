//! Storage driver classification.
//!
//! A pool's driver is either local (volumes bound to one cluster member) or
//! remote (shared storage visible from every member). The set of remote
//! driver names is owned by the storage-driver registry and injected here;
//! classification itself is a pure membership test.

use sqlx::SqliteConnection;

use crate::error::{CorralError, Result};

use super::VolumeDirectory;

/// How a pool's storage relates to cluster members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverClass {
    /// Storage bound to exactly one cluster member.
    Local,
    /// Shared storage reachable from every cluster member.
    Remote,
}

/// Source of the current set of remote (shared) storage driver names.
///
/// Implemented by the storage-driver registry and resolved when the directory
/// is constructed, so there is no global mutable state to override in tests.
pub trait RemoteDriverRegistry: Send + Sync {
    /// The driver names whose storage is visible from every cluster member.
    fn remote_driver_names(&self) -> Vec<String>;
}

/// A fixed remote-driver set, enough for deployments that do not hot-load
/// storage drivers.
#[derive(Debug, Clone)]
pub struct StaticRemoteDrivers {
    names: Vec<String>,
}

impl StaticRemoteDrivers {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { names: names.into_iter().map(Into::into).collect() }
    }
}

impl Default for StaticRemoteDrivers {
    fn default() -> Self {
        Self::new(["ceph", "cephfs"])
    }
}

impl RemoteDriverRegistry for StaticRemoteDrivers {
    fn remote_driver_names(&self) -> Vec<String> {
        self.names.clone()
    }
}

/// Classify a driver string against the remote-driver set.
pub(crate) fn driver_class(driver: &str, remote_drivers: &[String]) -> DriverClass {
    if remote_drivers.iter().any(|d| d == driver) {
        DriverClass::Remote
    } else {
        DriverClass::Local
    }
}

/// Fetch the driver string of a pool, failing when the pool does not exist.
pub(crate) async fn pool_driver(conn: &mut SqliteConnection, pool_id: i64) -> Result<String> {
    sqlx::query_scalar::<_, String>("SELECT driver FROM storage_pools WHERE id = ?")
        .bind(pool_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?
        .ok_or_else(|| CorralError::PoolNotFound { pool: pool_id.to_string() })
}

impl VolumeDirectory {
    /// Classify the pool's driver as local or remote storage.
    pub async fn classify_pool(&self, pool_id: i64) -> Result<DriverClass> {
        let mut conn = self.acquire().await?;
        let driver = pool_driver(&mut conn, pool_id).await?;
        Ok(driver_class(&driver, &self.remote_driver_names()))
    }
}
