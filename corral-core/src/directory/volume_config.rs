//! Config and description storage for volumes and snapshots.
//!
//! Config updates are replace, not merge: the existing keys are cleared and
//! the new map inserted. Entries with empty values are never persisted; an
//! empty value is how a key is deleted.

use std::collections::HashMap;

use sqlx::{Row, SqliteConnection};

use crate::error::{CorralError, Result};
use crate::types::ContentType;

/// Read the config map of a volume or snapshot record.
///
/// Two rows with the same key mean the schema invariant is broken; that is
/// reported as a fatal integrity error rather than silently resolved.
pub(crate) async fn volume_config_get(
    conn: &mut SqliteConnection,
    volume_id: i64,
    is_snapshot: bool,
) -> Result<HashMap<String, String>> {
    let query = if is_snapshot {
        "SELECT key, value FROM storage_volumes_snapshots_config WHERE storage_volume_snapshot_id = ?"
    } else {
        "SELECT key, value FROM storage_volumes_config WHERE storage_volume_id = ?"
    };

    let rows = sqlx::query(query)
        .bind(volume_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

    let mut config = HashMap::with_capacity(rows.len());
    for row in rows {
        let key: String = row.get("key");
        let value: String = row.get("value");

        if config.insert(key.clone(), value).is_some() {
            return Err(CorralError::Integrity {
                reason: format!(
                    "Duplicate config row found for key {:?} for storage volume ID {}",
                    key, volume_id
                ),
            });
        }
    }

    Ok(config)
}

/// Insert config entries for a volume or snapshot record, skipping entries
/// with empty values.
pub(crate) async fn volume_config_add(
    conn: &mut SqliteConnection,
    volume_id: i64,
    config: &HashMap<String, String>,
    is_snapshot: bool,
) -> Result<()> {
    let stmt = if is_snapshot {
        "INSERT INTO storage_volumes_snapshots_config (storage_volume_snapshot_id, key, value) VALUES (?, ?, ?)"
    } else {
        "INSERT INTO storage_volumes_config (storage_volume_id, key, value) VALUES (?, ?, ?)"
    };

    for (key, value) in config {
        if value.is_empty() {
            continue;
        }

        sqlx::query(stmt)
            .bind(volume_id)
            .bind(key)
            .bind(value)
            .execute(&mut *conn)
            .await
            .map_err(|e| CorralError::DatabaseError(e.to_string()))?;
    }

    Ok(())
}

/// Delete all config entries of a volume or snapshot record.
pub(crate) async fn volume_config_clear(
    conn: &mut SqliteConnection,
    volume_id: i64,
    is_snapshot: bool,
) -> Result<()> {
    let stmt = if is_snapshot {
        "DELETE FROM storage_volumes_snapshots_config WHERE storage_volume_snapshot_id = ?"
    } else {
        "DELETE FROM storage_volumes_config WHERE storage_volume_id = ?"
    };

    sqlx::query(stmt)
        .bind(volume_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Update the description of a volume or snapshot record.
pub(crate) async fn volume_description_update(
    conn: &mut SqliteConnection,
    volume_id: i64,
    description: &str,
    is_snapshot: bool,
) -> Result<()> {
    let stmt = if is_snapshot {
        "UPDATE storage_volumes_snapshots SET description = ? WHERE id = ?"
    } else {
        "UPDATE storage_volumes SET description = ? WHERE id = ?"
    };

    sqlx::query(stmt)
        .bind(description)
        .bind(volume_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Read the description of a volume or snapshot record by id.
pub(crate) async fn volume_description(
    conn: &mut SqliteConnection,
    volume_id: i64,
) -> Result<String> {
    sqlx::query_scalar::<_, String>("SELECT description FROM storage_volumes_all WHERE id = ?")
        .bind(volume_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| CorralError::DatabaseError(e.to_string()))?
        .ok_or(CorralError::VolumeNotFound)
}

/// Read the content type of a volume or snapshot record by id.
pub(crate) async fn volume_content_type(
    conn: &mut SqliteConnection,
    volume_id: i64,
) -> Result<ContentType> {
    let value = sqlx::query_scalar::<_, String>(
        "SELECT content_type FROM storage_volumes_all WHERE id = ?",
    )
    .bind(volume_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| CorralError::DatabaseError(e.to_string()))?
    .ok_or(CorralError::VolumeNotFound)?;

    ContentType::parse(&value)
}

/// Name of the cluster member a volume record is bound to.
pub(crate) async fn volume_node_name(
    conn: &mut SqliteConnection,
    volume_id: i64,
) -> Result<String> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT nodes.name FROM storage_volumes_all
          JOIN nodes ON nodes.id = storage_volumes_all.node_id
         WHERE storage_volumes_all.id = ?
        "#,
    )
    .bind(volume_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| CorralError::DatabaseError(e.to_string()))?
    .ok_or(CorralError::VolumeNotFound)
}
