//! Database migrations for the volume directory.

use crate::error::{CorralError, Result};
use sqlx::SqlitePool;
use tracing::{info, instrument};

const SCHEMA_VERSION: i64 = 1;

#[instrument(skip(pool))]
pub async fn run(pool: &SqlitePool) -> Result<()> {
    // Create schema_version table if not exists
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    let current_version: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    let current_version = current_version.unwrap_or(0);

    if current_version >= SCHEMA_VERSION {
        info!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    info!("Migrating database from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        migrate_to_v1(pool).await?;
    }

    Ok(())
}

#[instrument(skip(pool))]
async fn migrate_to_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration to schema version 1");

    // Projects table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // Cluster members table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            address TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // Storage pools table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storage_pools (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            driver TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // Storage volumes table.
    //
    // node_id is NULL for volumes on shared storage that have no owning
    // member. Ids are allocated explicitly from the storage_volumes_all view
    // so that volume and snapshot ids share one id space and by-id lookups
    // stay unambiguous.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storage_volumes (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            storage_pool_id INTEGER NOT NULL REFERENCES storage_pools(id) ON DELETE CASCADE,
            node_id INTEGER REFERENCES nodes(id) ON DELETE CASCADE,
            type TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            content_type TEXT NOT NULL DEFAULT 'filesystem',
            UNIQUE (storage_pool_id, node_id, project_id, name, type)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_storage_volumes_pool ON storage_volumes(storage_pool_id)")
        .execute(pool)
        .await
        .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_storage_volumes_node ON storage_volumes(node_id)")
        .execute(pool)
        .await
        .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // Volume config table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storage_volumes_config (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            storage_volume_id INTEGER NOT NULL REFERENCES storage_volumes(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_storage_volumes_config_key ON storage_volumes_config(storage_volume_id, key)",
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // Volume snapshots table. Ids come from the shared id space and are
    // monotonically increasing, which is how creation order is preserved.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storage_volumes_snapshots (
            id INTEGER PRIMARY KEY,
            storage_volume_id INTEGER NOT NULL REFERENCES storage_volumes(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            expiry_date INTEGER,
            UNIQUE (storage_volume_id, name)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_storage_volumes_snapshots_volume ON storage_volumes_snapshots(storage_volume_id)",
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // Snapshot config table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storage_volumes_snapshots_config (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            storage_volume_snapshot_id INTEGER NOT NULL REFERENCES storage_volumes_snapshots(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_storage_volumes_snapshots_config_key ON storage_volumes_snapshots_config(storage_volume_snapshot_id, key)",
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // View spanning volumes and their snapshots. Snapshot rows expose the
    // qualified <volume>/<snapshot> name and inherit pool, member, type and
    // content type from their parent, so name- and id-based lookups work the
    // same for both.
    sqlx::query(
        r#"
        CREATE VIEW IF NOT EXISTS storage_volumes_all
            (id, name, storage_pool_id, node_id, type, description, project_id, content_type) AS
        SELECT id, name, storage_pool_id, node_id, type, description, project_id, content_type
          FROM storage_volumes
        UNION ALL
        SELECT storage_volumes_snapshots.id,
               storage_volumes.name || '/' || storage_volumes_snapshots.name,
               storage_volumes.storage_pool_id,
               storage_volumes.node_id,
               storage_volumes.type,
               storage_volumes_snapshots.description,
               storage_volumes.project_id,
               storage_volumes.content_type
          FROM storage_volumes_snapshots
          JOIN storage_volumes ON storage_volumes.id = storage_volumes_snapshots.storage_volume_id
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    // Update schema version
    sqlx::query("DELETE FROM schema_version")
        .execute(pool)
        .await
        .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(1i64)
        .execute(pool)
        .await
        .map_err(|e| CorralError::MigrationFailed { reason: e.to_string() })?;

    info!("Migration to schema version 1 complete");
    Ok(())
}
