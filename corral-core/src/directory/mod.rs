//! Clustered storage-volume directory with SQLite persistence.
//!
//! The [`VolumeDirectory`] records which pool every storage volume belongs
//! to, which project owns it, and which cluster member (if any) physically
//! hosts it. Volumes on local storage drivers are bound to exactly one
//! member; volumes on remote drivers are visible from every member and are
//! backed either by a single member-less record or, for legacy schema
//! reasons, by one duplicate record per member. All mutations go through the
//! replicated mutator so those duplicates never diverge.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Row, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{CorralError, Result};
use crate::types::{
    is_snapshot_name, NodeInfo, StorageVolume, VolumeRecord, VolumeType, SNAPSHOT_DELIMITER,
};

pub mod classifier;
pub mod locate;
pub mod migrations;
pub mod snapshots;

mod replicate;
mod volume_config;

#[cfg(test)]
mod tests;

pub use classifier::{DriverClass, RemoteDriverRegistry, StaticRemoteDrivers};
pub use locate::{Resolution, VolumeLocation};

use classifier::{driver_class, pool_driver};
use locate::volume_id_on_member;
use replicate::{replicate_volume_change, VolumeMutation};
use volume_config::{
    volume_config_add, volume_config_get, volume_content_type, volume_description,
    volume_node_name,
};

/// The cluster's storage-volume directory.
///
/// Cheap to clone; all clones share one connection pool. Concurrent callers
/// are serialized by SQLite's transaction isolation, the directory itself
/// holds no mutable state.
#[derive(Clone)]
pub struct VolumeDirectory {
    pool: SqlitePool,
    node_id: i64,
    remote_drivers: Arc<dyn RemoteDriverRegistry>,
}

impl VolumeDirectory {
    /// Open the directory with an in-memory database (for tests).
    pub async fn new_in_memory(remote_drivers: Arc<dyn RemoteDriverRegistry>) -> Result<Self> {
        let config = Config { db_path: ":memory:".to_string(), ..Config::default() };
        Self::open(&config, remote_drivers).await
    }

    /// Open the directory, run migrations and register the current cluster
    /// member under `config.node_name`.
    #[instrument(skip(config, remote_drivers), fields(db_path = %config.db_path))]
    pub async fn open(
        config: &Config,
        remote_drivers: Arc<dyn RemoteDriverRegistry>,
    ) -> Result<Self> {
        info!("Opening volume directory at {:?}", config.db_path);

        let in_memory = config.db_path == ":memory:";

        // Create parent directory if it doesn't exist (but not for :memory:)
        if !in_memory {
            if let Some(parent) = Path::new(&config.db_path).parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CorralError::InvalidConfig {
                        reason: format!("Failed to create directory {}: {}", parent.display(), e),
                    }
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&config.db_path)
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .log_statements(tracing::log::LevelFilter::Debug);

        // An in-memory database lives and dies with its connection, so the
        // pool must hold exactly one and never recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        migrations::run(&pool).await?;

        // Register this cluster member, refreshing its address on restart.
        sqlx::query(
            "INSERT INTO nodes (name, address) VALUES (?, ?) ON CONFLICT(name) DO UPDATE SET address = excluded.address",
        )
        .bind(&config.node_name)
        .bind(&config.node_address)
        .execute(&pool)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let node_id: i64 = sqlx::query_scalar("SELECT id FROM nodes WHERE name = ?")
            .bind(&config.node_name)
            .fetch_one(&pool)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        info!("Volume directory ready (member {} id {})", config.node_name, node_id);

        Ok(Self { pool, node_id, remote_drivers })
    }

    /// Get a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The id of the cluster member this directory instance runs on.
    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    pub(crate) fn remote_driver_names(&self) -> Vec<String> {
        self.remote_drivers.remote_driver_names()
    }

    pub(crate) async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool.acquire().await.map_err(|e| CorralError::DatabaseError(e.to_string()))
    }

    // ========================
    // Collaborator entities
    // ========================

    /// Insert a new project.
    pub async fn create_project(&self, name: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO projects (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a new cluster member.
    pub async fn create_node(&self, name: &str, address: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO nodes (name, address) VALUES (?, ?)")
            .bind(name)
            .bind(address)
            .execute(&self.pool)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a new storage pool.
    pub async fn create_storage_pool(&self, name: &str, driver: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO storage_pools (name, driver) VALUES (?, ?)")
            .bind(name)
            .bind(driver)
            .execute(&self.pool)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Look up a storage pool by name.
    pub async fn storage_pool(&self, name: &str) -> Result<crate::types::StoragePool> {
        let row = sqlx::query("SELECT id, name, driver FROM storage_pools WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?
            .ok_or_else(|| CorralError::PoolNotFound { pool: name.to_string() })?;

        Ok(crate::types::StoragePool {
            id: row.get("id"),
            name: row.get("name"),
            driver: row.get("driver"),
        })
    }

    /// List all cluster members.
    pub async fn nodes(&self) -> Result<Vec<NodeInfo>> {
        let rows = sqlx::query("SELECT id, name, address FROM nodes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| NodeInfo { id: row.get("id"), name: row.get("name"), address: row.get("address") })
            .collect())
    }

    // ========================
    // Volume operations
    // ========================

    /// Create a new storage volume on the given pool.
    ///
    /// Remote-driver pools get the canonical member-less record; local pools
    /// bind the record to the current member. Returns the new record id.
    #[instrument(skip(self, config), fields(volume = %volume_name))]
    pub async fn create_volume(
        &self,
        project: &str,
        volume_name: &str,
        description: &str,
        volume_type: VolumeType,
        pool_id: i64,
        config: &HashMap<String, String>,
        content_type: crate::types::ContentType,
    ) -> Result<i64> {
        if is_snapshot_name(volume_name) {
            return Err(CorralError::InvalidVolumeName {
                name: volume_name.to_string(),
                reason: "Volume name may not be a snapshot".to_string(),
            });
        }

        let mut tx =
            self.pool.begin().await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let driver = pool_driver(&mut tx, pool_id).await?;
        let node_id = match driver_class(&driver, &self.remote_driver_names()) {
            DriverClass::Remote => None,
            DriverClass::Local => Some(self.node_id),
        };

        let project_id: i64 = sqlx::query_scalar("SELECT id FROM projects WHERE name = ?")
            .bind(project)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?
            .ok_or_else(|| CorralError::ProjectNotFound { name: project.to_string() })?;

        let result = sqlx::query(
            r#"
            INSERT INTO storage_volumes (id, name, storage_pool_id, node_id, type, description, project_id, content_type)
            VALUES ((SELECT IFNULL(MAX(id), 0) + 1 FROM storage_volumes_all), ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(volume_name)
        .bind(pool_id)
        .bind(node_id)
        .bind(volume_type.as_str())
        .bind(description)
        .bind(project_id)
        .bind(content_type.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            metrics::counter!("corral_db_errors_total", "operation" => "create_volume")
                .increment(1);
            CorralError::DatabaseError(e.to_string())
        })?;

        let volume_id = result.last_insert_rowid();

        volume_config_add(&mut tx, volume_id, config, false).await?;

        tx.commit().await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        metrics::counter!("corral_volumes_created_total").increment(1);

        Ok(volume_id)
    }

    /// Get a single volume (or snapshot, by qualified name) as seen from the
    /// current member, assembled into its logical view.
    #[instrument(skip(self), fields(volume = %volume_name))]
    pub async fn local_volume(
        &self,
        project: &str,
        volume_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
    ) -> Result<(i64, StorageVolume)> {
        let mut conn = self.acquire().await?;
        self.volume_on_member(&mut conn, project, volume_name, volume_type, pool_id, self.node_id)
            .await
    }

    /// Replace the description and config of a volume.
    ///
    /// The change is applied to every duplicate record when the pool driver
    /// is remote, all inside one transaction.
    #[instrument(skip(self, config), fields(volume = %volume_name))]
    pub async fn update_volume(
        &self,
        project: &str,
        volume_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
        description: &str,
        config: &HashMap<String, String>,
    ) -> Result<()> {
        let is_snapshot = is_snapshot_name(volume_name);
        let remote_drivers = self.remote_driver_names();

        let mut tx =
            self.pool.begin().await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let volume_id = volume_id_on_member(
            &mut tx,
            &remote_drivers,
            project,
            volume_name,
            volume_type,
            pool_id,
            self.node_id,
        )
        .await?;

        replicate_volume_change(
            &mut tx,
            &remote_drivers,
            volume_id,
            project,
            volume_name,
            volume_type,
            pool_id,
            &VolumeMutation::Update { description, config, is_snapshot },
        )
        .await?;

        tx.commit().await.map_err(|e| CorralError::DatabaseError(e.to_string()))
    }

    /// Rename a volume, or a snapshot by qualified name.
    ///
    /// Renaming a snapshot only replaces its short name; the parent prefix is
    /// immutable through this path.
    #[instrument(skip(self), fields(volume = %old_name, new = %new_name))]
    pub async fn rename_volume(
        &self,
        project: &str,
        old_name: &str,
        new_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
    ) -> Result<()> {
        let is_snapshot = is_snapshot_name(old_name);

        let persisted_name = if is_snapshot {
            let short = new_name
                .split_once(SNAPSHOT_DELIMITER)
                .map(|(_, short)| short)
                .ok_or_else(|| CorralError::InvalidVolumeName {
                    name: new_name.to_string(),
                    reason: "New snapshot name must be qualified with its volume".to_string(),
                })?;

            if short.is_empty() || short.contains(SNAPSHOT_DELIMITER) {
                return Err(CorralError::InvalidVolumeName {
                    name: new_name.to_string(),
                    reason: "Invalid snapshot name".to_string(),
                });
            }

            short
        } else {
            if is_snapshot_name(new_name) {
                return Err(CorralError::InvalidVolumeName {
                    name: new_name.to_string(),
                    reason: "Volume name may not be a snapshot".to_string(),
                });
            }

            new_name
        };

        let remote_drivers = self.remote_driver_names();

        let mut tx =
            self.pool.begin().await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let volume_id = volume_id_on_member(
            &mut tx,
            &remote_drivers,
            project,
            old_name,
            volume_type,
            pool_id,
            self.node_id,
        )
        .await?;

        replicate_volume_change(
            &mut tx,
            &remote_drivers,
            volume_id,
            project,
            old_name,
            volume_type,
            pool_id,
            &VolumeMutation::Rename { new_name: persisted_name, is_snapshot },
        )
        .await?;

        tx.commit().await.map_err(|e| CorralError::DatabaseError(e.to_string()))
    }

    /// Delete a volume, or a snapshot by qualified name.
    #[instrument(skip(self), fields(volume = %volume_name))]
    pub async fn remove_volume(
        &self,
        project: &str,
        volume_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
    ) -> Result<()> {
        let is_snapshot = is_snapshot_name(volume_name);
        let remote_drivers = self.remote_driver_names();

        let mut tx =
            self.pool.begin().await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let volume_id = volume_id_on_member(
            &mut tx,
            &remote_drivers,
            project,
            volume_name,
            volume_type,
            pool_id,
            self.node_id,
        )
        .await?;

        replicate_volume_change(
            &mut tx,
            &remote_drivers,
            volume_id,
            project,
            volume_name,
            volume_type,
            pool_id,
            &VolumeMutation::Delete { is_snapshot },
        )
        .await
        .map_err(|e| {
            metrics::counter!("corral_db_errors_total", "operation" => "remove_volume")
                .increment(1);
            e
        })?;

        tx.commit().await.map_err(|e| CorralError::DatabaseError(e.to_string()))
    }

    // ========================
    // Listing operations
    // ========================

    /// All volumes of the given types on a pool, across every cluster member.
    ///
    /// Members are enumerated from the records themselves (remote-driver
    /// pools are excluded from that scan since their records carry no
    /// member); a member with no volumes is skipped, any other failure aborts
    /// the whole listing. For remote-driver pools the shared volumes are
    /// fetched once through the current member.
    #[instrument(skip(self))]
    pub async fn pool_volumes(
        &self,
        project: &str,
        pool_id: i64,
        volume_types: &[VolumeType],
    ) -> Result<Vec<StorageVolume>> {
        let remote_drivers = self.remote_driver_names();

        let sql = format!(
            r#"
            SELECT DISTINCT storage_volumes_all.node_id
              FROM storage_volumes_all
              JOIN projects ON projects.id = storage_volumes_all.project_id
              JOIN storage_pools ON storage_pools.id = storage_volumes_all.storage_pool_id
             WHERE projects.name = ?
               AND storage_volumes_all.storage_pool_id = ?
               AND storage_volumes_all.node_id IS NOT NULL
               AND storage_pools.driver NOT IN {}
            "#,
            sql_params(remote_drivers.len())
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(project).bind(pool_id);
        for driver in &remote_drivers {
            query = query.bind(driver);
        }

        let node_ids = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let mut volumes = Vec::new();

        for node_id in node_ids {
            match self.volumes_on_member(project, pool_id, node_id, volume_types).await {
                Ok(mut node_volumes) => volumes.append(&mut node_volumes),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        if self.classify_pool(pool_id).await? == DriverClass::Remote {
            match self.volumes_on_member(project, pool_id, self.node_id, volume_types).await {
                Ok(mut shared) => volumes.append(&mut shared),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        Ok(volumes)
    }

    /// All volumes of the given types on a pool as seen from the current
    /// member. Fails with [`CorralError::VolumeNotFound`] when there are
    /// none.
    pub async fn local_pool_volumes(
        &self,
        project: &str,
        pool_id: i64,
        volume_types: &[VolumeType],
    ) -> Result<Vec<StorageVolume>> {
        self.volumes_on_member(project, pool_id, self.node_id, volume_types).await
    }

    /// Names of all volumes on a pool hosted by the current member.
    pub async fn pool_volume_names(&self, pool_id: i64) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM storage_volumes_all WHERE storage_pool_id = ? AND node_id = ?",
        )
        .bind(pool_id)
        .bind(self.node_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))
    }

    /// All volumes of one type across all pools and projects.
    pub async fn volumes_with_type(&self, volume_type: VolumeType) -> Result<Vec<VolumeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT storage_volumes.id, storage_volumes.name, storage_volumes.description,
                   storage_pools.name AS pool_name, projects.name AS project_name,
                   storage_volumes.node_id
              FROM storage_volumes
              JOIN storage_pools ON storage_pools.id = storage_volumes.storage_pool_id
              JOIN projects ON projects.id = storage_volumes.project_id
             WHERE storage_volumes.type = ?
            "#,
        )
        .bind(volume_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let mut conn = self.acquire().await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            records.push(VolumeRecord {
                id,
                name: row.get("name"),
                volume_type,
                pool_name: row.get("pool_name"),
                project: row.get("project_name"),
                node_id: row.get("node_id"),
                description: row.get("description"),
                config: volume_config_get(&mut conn, id, false).await?,
            });
        }

        Ok(records)
    }

    /// Look up one volume record by id.
    pub async fn volume_with_id(&self, volume_id: i64) -> Result<VolumeRecord> {
        let row = sqlx::query(
            r#"
            SELECT storage_volumes.id, storage_volumes.name, storage_volumes.description,
                   storage_volumes.type, storage_volumes.node_id,
                   storage_pools.name AS pool_name, projects.name AS project_name
              FROM storage_volumes
              JOIN storage_pools ON storage_pools.id = storage_volumes.storage_pool_id
              JOIN projects ON projects.id = storage_volumes.project_id
             WHERE storage_volumes.id = ?
            "#,
        )
        .bind(volume_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?
        .ok_or(CorralError::VolumeNotFound)?;

        let volume_type: String = row.get("type");

        let mut conn = self.acquire().await?;
        Ok(VolumeRecord {
            id: row.get("id"),
            name: row.get("name"),
            volume_type: VolumeType::parse(&volume_type)?,
            pool_name: row.get("pool_name"),
            project: row.get("project_name"),
            node_id: row.get("node_id"),
            description: row.get("description"),
            config: volume_config_get(&mut conn, volume_id, false).await?,
        })
    }

    /// All custom volumes in one project.
    pub async fn custom_volumes_in_project(&self, project: &str) -> Result<Vec<VolumeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT storage_volumes.id, storage_volumes.name, storage_volumes.description,
                   storage_pools.name AS pool_name, storage_volumes.node_id
              FROM storage_volumes
              JOIN storage_pools ON storage_pools.id = storage_volumes.storage_pool_id
              JOIN projects ON projects.id = storage_volumes.project_id
             WHERE storage_volumes.type = ? AND projects.name = ?
            "#,
        )
        .bind(VolumeType::Custom.as_str())
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let mut conn = self.acquire().await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            records.push(VolumeRecord {
                id,
                name: row.get("name"),
                volume_type: VolumeType::Custom,
                pool_name: row.get("pool_name"),
                project: project.to_string(),
                node_id: row.get("node_id"),
                description: row.get("description"),
                config: volume_config_get(&mut conn, id, false).await?,
            });
        }

        Ok(records)
    }

    /// API URIs of all custom volumes in one project, targeted at the hosting
    /// member when the record carries one.
    pub async fn volume_uris(&self, project: &str) -> Result<Vec<String>> {
        let volumes = self.custom_volumes_in_project(project).await?;
        let nodes = self.nodes().await?;

        let mut uris = Vec::with_capacity(volumes.len());
        for volume in volumes {
            let mut uri = format!(
                "/1.0/storage-pools/{}/volumes/custom/{}?project={}",
                volume.pool_name, volume.name, project
            );

            if let Some(node_id) = volume.node_id {
                if let Some(node) = nodes.iter().find(|n| n.id == node_id) {
                    uri.push_str(&format!("&target={}", node.name));
                }
            }

            uris.push(uri);
        }

        Ok(uris)
    }

    /// The cluster members reporting a record for a logical volume.
    ///
    /// Fails with [`CorralError::NoClusterMember`] when the volume exists on
    /// shared storage without a single owning member, either as a member-less
    /// record or as legacy per-member duplicates on a remote-driver pool.
    #[instrument(skip(self), fields(volume = %volume_name))]
    pub async fn volume_nodes(
        &self,
        pool_id: i64,
        project: &str,
        volume_name: &str,
        volume_type: VolumeType,
    ) -> Result<Vec<NodeInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(nodes.id, 0) AS node_id,
                   COALESCE(nodes.name, '') AS node_name,
                   COALESCE(nodes.address, '') AS node_address
              FROM storage_volumes_all
              JOIN projects ON projects.id = storage_volumes_all.project_id
              LEFT JOIN nodes ON storage_volumes_all.node_id = nodes.id
             WHERE storage_volumes_all.storage_pool_id = ?
               AND projects.name = ?
               AND storage_volumes_all.name = ?
               AND storage_volumes_all.type = ?
            "#,
        )
        .bind(pool_id)
        .bind(project)
        .bind(volume_name)
        .bind(volume_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(CorralError::VolumeNotFound);
        }

        let nodes: Vec<NodeInfo> = rows
            .into_iter()
            .map(|row| NodeInfo {
                id: row.get("node_id"),
                name: row.get("node_name"),
                address: row.get("node_address"),
            })
            .collect();

        // A zero id means the record is defined without a cluster member.
        if nodes.iter().any(|node| node.id == 0) {
            return Err(CorralError::NoClusterMember);
        }

        if nodes.len() > 1 {
            // Earlier schema versions created one record per member for
            // volumes on remote storage pools, so several member rows on a
            // remote driver mean "no explicit member", same as the canonical
            // member-less record. Any other multiplicity is corruption.
            return match self.classify_pool(pool_id).await? {
                DriverClass::Remote => Err(CorralError::NoClusterMember),
                DriverClass::Local => Err(CorralError::Integrity {
                    reason: format!(
                        "Volume {:?} in pool {} has {} member records on a local storage driver",
                        volume_name,
                        pool_id,
                        nodes.len()
                    ),
                }),
            };
        }

        Ok(nodes)
    }

    /// Remove image volumes whose names are not in the given set of image
    /// fingerprints.
    pub async fn remove_image_volumes(&self, fingerprints: &[String]) -> Result<()> {
        if fingerprints.is_empty() {
            sqlx::query("DELETE FROM storage_volumes WHERE type = ?")
                .bind(VolumeType::Image.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| CorralError::DatabaseError(e.to_string()))?;
            return Ok(());
        }

        let sql = format!(
            "DELETE FROM storage_volumes WHERE type = ? AND name NOT IN {}",
            sql_params(fingerprints.len())
        );

        let mut query = sqlx::query(&sql).bind(VolumeType::Image.as_str());
        for fingerprint in fingerprints {
            query = query.bind(fingerprint);
        }

        query.execute(&self.pool).await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    // ========================
    // Member-scoped internals
    // ========================

    /// Assemble the logical view of one volume as seen from the given member.
    async fn volume_on_member(
        &self,
        conn: &mut SqliteConnection,
        project: &str,
        volume_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
        node_id: i64,
    ) -> Result<(i64, StorageVolume)> {
        let is_snapshot = is_snapshot_name(volume_name);
        let remote_drivers = self.remote_driver_names();

        let volume_id = volume_id_on_member(
            &mut *conn,
            &remote_drivers,
            project,
            volume_name,
            volume_type,
            pool_id,
            node_id,
        )
        .await?;

        let driver = pool_driver(&mut *conn, pool_id).await?;
        let location = match driver_class(&driver, &remote_drivers) {
            // Shared volumes have no location; they are everywhere.
            DriverClass::Remote => String::new(),
            DriverClass::Local => volume_node_name(&mut *conn, volume_id).await?,
        };

        let config = volume_config_get(&mut *conn, volume_id, is_snapshot).await?;
        let description = volume_description(&mut *conn, volume_id).await?;
        let content_type = volume_content_type(&mut *conn, volume_id).await?;

        let volume = StorageVolume {
            name: volume_name.to_string(),
            volume_type,
            description,
            config,
            location,
            content_type,
        };

        Ok((volume_id, volume))
    }

    /// All volumes of the given types on a pool as seen from one member.
    async fn volumes_on_member(
        &self,
        project: &str,
        pool_id: i64,
        node_id: i64,
        volume_types: &[VolumeType],
    ) -> Result<Vec<StorageVolume>> {
        let mut conn = self.acquire().await?;

        let mut volumes = Vec::new();
        for volume_type in volume_types {
            let names = self
                .volume_names_on_member(&mut conn, project, *volume_type, pool_id, node_id)
                .await?;

            for name in names {
                let (_, volume) = self
                    .volume_on_member(&mut conn, project, &name, *volume_type, pool_id, node_id)
                    .await?;
                volumes.push(volume);
            }
        }

        if volumes.is_empty() {
            return Err(CorralError::VolumeNotFound);
        }

        Ok(volumes)
    }

    /// Names of all volumes of one type on a pool as seen from one member.
    async fn volume_names_on_member(
        &self,
        conn: &mut SqliteConnection,
        project: &str,
        volume_type: VolumeType,
        pool_id: i64,
        node_id: i64,
    ) -> Result<Vec<String>> {
        let remote_drivers = self.remote_driver_names();
        let sql = format!(
            r#"
            SELECT storage_volumes_all.name
              FROM storage_volumes_all
              JOIN projects ON projects.id = storage_volumes_all.project_id
              JOIN storage_pools ON storage_pools.id = storage_volumes_all.storage_pool_id
             WHERE projects.name = ?
               AND storage_volumes_all.storage_pool_id = ?
               AND storage_volumes_all.type = ?
               AND (storage_volumes_all.node_id = ?
                    OR (storage_volumes_all.node_id IS NULL AND storage_pools.driver IN {}))
            "#,
            sql_params(remote_drivers.len())
        );

        let mut query = sqlx::query_scalar::<_, String>(&sql)
            .bind(project)
            .bind(pool_id)
            .bind(volume_type.as_str())
            .bind(node_id);
        for driver in &remote_drivers {
            query = query.bind(driver);
        }

        query.fetch_all(&mut *conn).await.map_err(|e| CorralError::DatabaseError(e.to_string()))
    }
}

/// Render a `(?, ?, ...)` parameter list for a SQL `IN` clause.
pub(crate) fn sql_params(n: usize) -> String {
    let mut params = String::with_capacity(2 + n * 3);
    params.push('(');
    for i in 0..n {
        if i > 0 {
            params.push_str(", ");
        }
        params.push('?');
    }
    params.push(')');
    params
}
