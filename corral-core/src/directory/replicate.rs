//! Replicated volume mutation.
//!
//! Volumes on remote-driver pools may be backed by one duplicate record per
//! cluster member (legacy schema form). Any mutation of such a volume must
//! touch every duplicate inside the same transaction, or the copies diverge.
//! Local-driver volumes are mutated through exactly one record.

use std::collections::HashMap;

use sqlx::SqliteConnection;

use crate::error::{CorralError, Result};
use crate::types::VolumeType;

use super::classifier::{driver_class, pool_driver, DriverClass};
use super::locate::volume_ids_any_member;
use super::volume_config::{volume_config_add, volume_config_clear, volume_description_update};

/// The closed set of record mutations that replicate across duplicates.
#[derive(Debug)]
pub(crate) enum VolumeMutation<'a> {
    /// Replace description and config wholesale.
    Update {
        description: &'a str,
        config: &'a HashMap<String, String>,
        is_snapshot: bool,
    },
    /// Rename the record. For snapshots `new_name` is the short name; the
    /// parent prefix is immutable through this path.
    Rename { new_name: &'a str, is_snapshot: bool },
    Delete { is_snapshot: bool },
}

/// Apply `change` to the record with the given id and, when the pool's
/// driver is remote, to every other record sharing the logical identity.
///
/// Runs on the caller's transaction: if any application fails the caller's
/// rollback reverts all of them, so readers only ever observe all-old or
/// all-new duplicates.
pub(crate) async fn replicate_volume_change(
    conn: &mut SqliteConnection,
    remote_drivers: &[String],
    volume_id: i64,
    project: &str,
    volume_name: &str,
    volume_type: VolumeType,
    pool_id: i64,
    change: &VolumeMutation<'_>,
) -> Result<()> {
    let driver = pool_driver(&mut *conn, pool_id).await?;

    let volume_ids = if driver_class(&driver, remote_drivers) == DriverClass::Remote {
        volume_ids_any_member(&mut *conn, project, volume_name, volume_type, pool_id).await?
    } else {
        vec![volume_id]
    };

    for id in volume_ids {
        apply_mutation(&mut *conn, id, change).await?;
    }

    Ok(())
}

async fn apply_mutation(
    conn: &mut SqliteConnection,
    volume_id: i64,
    change: &VolumeMutation<'_>,
) -> Result<()> {
    match change {
        VolumeMutation::Update { description, config, is_snapshot } => {
            volume_config_clear(&mut *conn, volume_id, *is_snapshot).await?;
            volume_config_add(&mut *conn, volume_id, *config, *is_snapshot).await?;
            volume_description_update(&mut *conn, volume_id, *description, *is_snapshot).await
        }
        VolumeMutation::Rename { new_name, is_snapshot } => {
            let stmt = if *is_snapshot {
                "UPDATE storage_volumes_snapshots SET name = ? WHERE id = ?"
            } else {
                "UPDATE storage_volumes SET name = ? WHERE id = ?"
            };

            sqlx::query(stmt)
                .bind(*new_name)
                .bind(volume_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| CorralError::DatabaseError(e.to_string()))?;
            Ok(())
        }
        VolumeMutation::Delete { is_snapshot } => {
            let stmt = if *is_snapshot {
                "DELETE FROM storage_volumes_snapshots WHERE id = ?"
            } else {
                "DELETE FROM storage_volumes WHERE id = ?"
            };

            sqlx::query(stmt)
                .bind(volume_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| CorralError::DatabaseError(e.to_string()))?;
            Ok(())
        }
    }
}
