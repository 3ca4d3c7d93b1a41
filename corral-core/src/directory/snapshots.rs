//! Volume snapshot sequencing.

use std::collections::HashMap;

use sqlx::Row;
use tracing::instrument;

use crate::error::{CorralError, Result};
use crate::types::{ContentType, VolumeSnapshot, VolumeType, SNAPSHOT_DELIMITER};

use super::locate::volume_id_on_member;
use super::volume_config::{volume_config_add, volume_config_get};
use super::{sql_params, VolumeDirectory};

impl VolumeDirectory {
    /// All snapshots of a volume visible from the current member, oldest
    /// first.
    ///
    /// Ordering by id is a contract, not cosmetics: ids are allocated in
    /// creation order and storage engines replay incremental deltas in
    /// exactly this order when migrating a volume.
    #[instrument(skip(self))]
    pub async fn volume_snapshots(
        &self,
        project: &str,
        volume_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
    ) -> Result<Vec<VolumeSnapshot>> {
        let remote_drivers = self.remote_driver_names();
        let sql = format!(
            r#"
            SELECT storage_volumes_snapshots.id,
                   storage_volumes_snapshots.name,
                   storage_volumes_snapshots.description,
                   storage_volumes_snapshots.expiry_date,
                   storage_volumes.content_type
              FROM storage_volumes_snapshots
              JOIN storage_volumes ON storage_volumes_snapshots.storage_volume_id = storage_volumes.id
              JOIN projects ON projects.id = storage_volumes.project_id
              JOIN storage_pools ON storage_pools.id = storage_volumes.storage_pool_id
             WHERE storage_volumes.storage_pool_id = ?
               AND storage_volumes.type = ?
               AND storage_volumes.name = ?
               AND projects.name = ?
               AND (storage_volumes.node_id = ?
                    OR (storage_volumes.node_id IS NULL AND storage_pools.driver IN {}))
             ORDER BY storage_volumes_snapshots.id
            "#,
            sql_params(remote_drivers.len())
        );

        let mut conn = self.acquire().await?;

        let mut query = sqlx::query(&sql)
            .bind(pool_id)
            .bind(volume_type.as_str())
            .bind(volume_name)
            .bind(project)
            .bind(self.node_id);
        for driver in &remote_drivers {
            query = query.bind(driver);
        }

        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let short_name: String = row.get("name");
            let content_type: String = row.get("content_type");

            snapshots.push(VolumeSnapshot {
                id,
                name: format!("{}{}{}", volume_name, SNAPSHOT_DELIMITER, short_name),
                description: row.get("description"),
                expiry: row.get("expiry_date"),
                content_type: ContentType::parse(&content_type)?,
                config: HashMap::new(),
            });
        }

        for snapshot in &mut snapshots {
            snapshot.config = volume_config_get(&mut conn, snapshot.id, true).await?;
        }

        Ok(snapshots)
    }

    /// The numeric suffix the next snapshot of the volume should use for the
    /// given naming pattern.
    ///
    /// `pattern` carries a single `%d` placeholder. Existing short names that
    /// parse as `prefix<number>suffix` bid with their number; anything else
    /// is ignored. Returns one past the highest bid, or 0 when nothing
    /// parses.
    #[instrument(skip(self))]
    pub async fn next_snapshot_index(
        &self,
        pool_name: &str,
        volume_name: &str,
        volume_type: VolumeType,
        pattern: &str,
    ) -> Result<i64> {
        let remote_drivers = self.remote_driver_names();
        let sql = format!(
            r#"
            SELECT storage_volumes_snapshots.name
              FROM storage_volumes_snapshots
              JOIN storage_volumes ON storage_volumes_snapshots.storage_volume_id = storage_volumes.id
              JOIN storage_pools ON storage_volumes.storage_pool_id = storage_pools.id
             WHERE storage_volumes.type = ?
               AND storage_volumes.name = ?
               AND storage_pools.name = ?
               AND (storage_volumes.node_id = ?
                    OR (storage_volumes.node_id IS NULL AND storage_pools.driver IN {}))
            "#,
            sql_params(remote_drivers.len())
        );

        let mut conn = self.acquire().await?;

        let mut query = sqlx::query_scalar::<_, String>(&sql)
            .bind(volume_type.as_str())
            .bind(volume_name)
            .bind(pool_name)
            .bind(self.node_id);
        for driver in &remote_drivers {
            query = query.bind(driver);
        }

        let names = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let next = names
            .iter()
            .filter_map(|name| parse_snapshot_index(pattern, name))
            .max()
            .map_or(0, |max| max + 1);

        Ok(next)
    }

    /// Create a snapshot of a volume resolved on the current member.
    ///
    /// `qualified_name` is the `<volume>/<snapshot>` form; snapshots of
    /// snapshots are not supported. Returns the new snapshot record id.
    #[instrument(skip(self, config))]
    pub async fn create_volume_snapshot(
        &self,
        project: &str,
        qualified_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
        description: &str,
        expiry: Option<i64>,
        config: &HashMap<String, String>,
    ) -> Result<i64> {
        let Some((parent_name, short_name)) = qualified_name.split_once(SNAPSHOT_DELIMITER) else {
            return Err(CorralError::InvalidVolumeName {
                name: qualified_name.to_string(),
                reason: "Snapshot name must be qualified with its volume".to_string(),
            });
        };

        if short_name.is_empty() || short_name.contains(SNAPSHOT_DELIMITER) {
            return Err(CorralError::InvalidVolumeName {
                name: qualified_name.to_string(),
                reason: "Invalid snapshot name".to_string(),
            });
        }

        let remote_drivers = self.remote_driver_names();
        let mut tx =
            self.pool.begin().await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let parent_id = volume_id_on_member(
            &mut tx,
            &remote_drivers,
            project,
            parent_name,
            volume_type,
            pool_id,
            self.node_id,
        )
        .await?;

        // Allocate the id from the shared volume/snapshot id space so that
        // creation order is recoverable from the ids alone.
        let result = sqlx::query(
            r#"
            INSERT INTO storage_volumes_snapshots (id, storage_volume_id, name, description, expiry_date)
            VALUES ((SELECT IFNULL(MAX(id), 0) + 1 FROM storage_volumes_all), ?, ?, ?, ?)
            "#,
        )
        .bind(parent_id)
        .bind(short_name)
        .bind(description)
        .bind(expiry)
        .execute(&mut *tx)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        let snapshot_id = result.last_insert_rowid();

        volume_config_add(&mut tx, snapshot_id, config, true).await?;

        tx.commit().await.map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        Ok(snapshot_id)
    }
}

/// Parse a snapshot short name against a `%d` naming pattern.
///
/// Deliberately forgiving: this is a scanner for harvesting indices already
/// in use, not a validator. A pattern without a placeholder matches nothing.
pub(crate) fn parse_snapshot_index(pattern: &str, name: &str) -> Option<i64> {
    let (prefix, suffix) = pattern.split_once("%d")?;

    let middle = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    middle.parse().ok()
}
