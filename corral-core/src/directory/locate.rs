//! Logical volume resolution.
//!
//! A logical volume identity `(project, pool, type, name)` can be backed by
//! one record bound to a member (local drivers), one member-less record
//! (remote drivers, canonical form) or several per-member duplicate records
//! (remote drivers, legacy form). The locator computes that multiplicity once
//! and hands callers a [`Resolution`], so no other code path re-derives it.

use sqlx::{Row, SqliteConnection};

use crate::error::{CorralError, Result};
use crate::types::VolumeType;

use super::classifier::{driver_class, pool_driver, DriverClass};
use super::{sql_params, VolumeDirectory};

/// A single resolved volume record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeLocation {
    pub volume_id: i64,
    /// None when the record is not bound to a cluster member.
    pub node_id: Option<i64>,
}

/// Outcome of resolving a logical volume identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one record backs the identity.
    Single(VolumeLocation),
    /// The identity is backed by legacy per-member duplicates on shared
    /// storage: the volume exists but has no single owning member.
    SharedNoMember,
}

impl VolumeDirectory {
    /// Resolve a logical volume identity to its backing record(s).
    ///
    /// Fails with [`CorralError::VolumeNotFound`] when nothing matches and
    /// with [`CorralError::Integrity`] when a local-driver pool holds more
    /// than one record for the identity.
    pub async fn locate(
        &self,
        project: &str,
        volume_name: &str,
        volume_type: VolumeType,
        pool_id: i64,
    ) -> Result<Resolution> {
        let mut conn = self.acquire().await?;

        let rows = sqlx::query(
            r#"
            SELECT storage_volumes_all.id, storage_volumes_all.node_id
              FROM storage_volumes_all
              JOIN projects ON projects.id = storage_volumes_all.project_id
             WHERE projects.name = ?
               AND storage_volumes_all.storage_pool_id = ?
               AND storage_volumes_all.name = ?
               AND storage_volumes_all.type = ?
             ORDER BY storage_volumes_all.id
            "#,
        )
        .bind(project)
        .bind(pool_id)
        .bind(volume_name)
        .bind(volume_type.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

        match rows.len() {
            0 => Err(CorralError::VolumeNotFound),
            1 => {
                let row = &rows[0];
                Ok(Resolution::Single(VolumeLocation {
                    volume_id: row.get("id"),
                    node_id: row.get("node_id"),
                }))
            }
            n => {
                let driver = pool_driver(&mut conn, pool_id).await?;
                match driver_class(&driver, &self.remote_driver_names()) {
                    DriverClass::Remote => Ok(Resolution::SharedNoMember),
                    DriverClass::Local => Err(CorralError::Integrity {
                        reason: format!(
                            "Volume {:?} in pool {} has {} records on a local storage driver",
                            volume_name, pool_id, n
                        ),
                    }),
                }
            }
        }
    }
}

/// Resolve the id of a volume (or snapshot, by qualified name) as seen from
/// one cluster member: records bound to that member, plus member-less records
/// on remote-driver pools.
///
/// When legacy duplication leaves several matching records, the first by id
/// is used for reads; writes go through the replicated mutator instead.
pub(crate) async fn volume_id_on_member(
    conn: &mut SqliteConnection,
    remote_drivers: &[String],
    project: &str,
    volume_name: &str,
    volume_type: VolumeType,
    pool_id: i64,
    node_id: i64,
) -> Result<i64> {
    let sql = format!(
        r#"
        SELECT storage_volumes_all.id
          FROM storage_volumes_all
          JOIN storage_pools ON storage_volumes_all.storage_pool_id = storage_pools.id
          JOIN projects ON storage_volumes_all.project_id = projects.id
         WHERE projects.name = ?
           AND storage_volumes_all.storage_pool_id = ?
           AND storage_volumes_all.name = ?
           AND storage_volumes_all.type = ?
           AND (storage_volumes_all.node_id = ?
                OR (storage_volumes_all.node_id IS NULL AND storage_pools.driver IN {}))
         ORDER BY storage_volumes_all.id
        "#,
        sql_params(remote_drivers.len())
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql)
        .bind(project)
        .bind(pool_id)
        .bind(volume_name)
        .bind(volume_type.as_str())
        .bind(node_id);
    for driver in remote_drivers {
        query = query.bind(driver);
    }

    let ids = query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

    ids.first().copied().ok_or(CorralError::VolumeNotFound)
}

/// All record ids sharing the logical identity, regardless of member. This is
/// the write-side target set for remote-driver pools.
pub(crate) async fn volume_ids_any_member(
    conn: &mut SqliteConnection,
    project: &str,
    volume_name: &str,
    volume_type: VolumeType,
    pool_id: i64,
) -> Result<Vec<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT storage_volumes_all.id
          FROM storage_volumes_all
          JOIN projects ON projects.id = storage_volumes_all.project_id
         WHERE projects.name = ?
           AND storage_volumes_all.name = ?
           AND storage_volumes_all.type = ?
           AND storage_volumes_all.storage_pool_id = ?
         ORDER BY storage_volumes_all.id
        "#,
    )
    .bind(project)
    .bind(volume_name)
    .bind(volume_type.as_str())
    .bind(pool_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| CorralError::DatabaseError(e.to_string()))
}
