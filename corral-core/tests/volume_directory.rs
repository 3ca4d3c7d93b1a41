//! Integration tests for the clustered storage-volume directory.
//!
//! These exercise the legacy schema shape where a volume on shared storage
//! is represented by one duplicate record per cluster member, and verify
//! that mutations keep the duplicates in lock-step while lookups collapse
//! them into the "no single owning member" condition.

use std::collections::HashMap;
use std::sync::Arc;

use corral_core::{
    Config, CorralError, StaticRemoteDrivers, VolumeDirectory, VolumeType,
};

async fn open_directory(node_name: &str) -> VolumeDirectory {
    let config = Config {
        db_path: ":memory:".to_string(),
        node_name: node_name.to_string(),
        node_address: "10.32.1.1:8443".to_string(),
        ..Config::default()
    };
    VolumeDirectory::open(&config, Arc::new(StaticRemoteDrivers::new(["ceph", "cephfs"])))
        .await
        .unwrap()
}

async fn insert_legacy_duplicate(
    dir: &VolumeDirectory,
    project: &str,
    pool_id: i64,
    node_id: i64,
    name: &str,
) -> i64 {
    let result = sqlx::query(
        r#"
        INSERT INTO storage_volumes (id, name, storage_pool_id, node_id, type, description, project_id, content_type)
        VALUES ((SELECT IFNULL(MAX(id), 0) + 1 FROM storage_volumes_all), ?, ?, ?, 'custom', 'old desc',
                (SELECT id FROM projects WHERE name = ?), 'filesystem')
        "#,
    )
    .bind(name)
    .bind(pool_id)
    .bind(node_id)
    .bind(project)
    .execute(dir.pool())
    .await
    .unwrap();

    result.last_insert_rowid()
}

#[tokio::test]
async fn legacy_duplicates_update_in_lockstep_and_report_no_member() {
    let dir = open_directory("m1").await;

    dir.create_project("proj").await.unwrap();
    let member2 = dir.create_node("m2", "10.32.1.2:8443").await.unwrap();
    let pool = dir.create_storage_pool("tank", "ceph").await.unwrap();

    // Two legacy duplicate records for the same logical volume, one per
    // cluster member.
    let id1 = insert_legacy_duplicate(&dir, "proj", pool, dir.node_id(), "data").await;
    let id2 = insert_legacy_duplicate(&dir, "proj", pool, member2, "data").await;

    dir.update_volume("proj", "data", VolumeType::Custom, pool, "new desc", &HashMap::new())
        .await
        .unwrap();

    // The volume is valid but has no single owning member: not a two-member
    // list, not a lookup failure.
    let result = dir.volume_nodes(pool, "proj", "data", VolumeType::Custom).await;
    assert!(matches!(result, Err(CorralError::NoClusterMember)));

    // Both underlying records carry the new description.
    for id in [id1, id2] {
        let description: String =
            sqlx::query_scalar("SELECT description FROM storage_volumes WHERE id = ?")
                .bind(id)
                .fetch_one(dir.pool())
                .await
                .unwrap();
        assert_eq!(description, "new desc");
    }
}

#[tokio::test]
async fn shared_volume_reads_resolve_through_any_member() {
    let dir = open_directory("m1").await;

    dir.create_project("proj").await.unwrap();
    let pool = dir.create_storage_pool("tank", "ceph").await.unwrap();

    dir.create_volume(
        "proj",
        "cache",
        "scratch space",
        VolumeType::Custom,
        pool,
        &HashMap::new(),
        corral_core::ContentType::Filesystem,
    )
    .await
    .unwrap();

    // The canonical member-less record resolves through the member-aware
    // lookup, with an empty location.
    let (_, volume) =
        dir.local_volume("proj", "cache", VolumeType::Custom, pool).await.unwrap();
    assert_eq!(volume.description, "scratch space");
    assert_eq!(volume.location, "");
}
