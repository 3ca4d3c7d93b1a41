#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use sqlx::Row;

    use crate::config::Config;
    use crate::directory::{
        DriverClass, Resolution, StaticRemoteDrivers, VolumeDirectory, VolumeLocation,
    };
    use crate::error::CorralError;
    use crate::types::{ContentType, VolumeType};

    async fn test_directory() -> VolumeDirectory {
        VolumeDirectory::new_in_memory(Arc::new(StaticRemoteDrivers::default())).await.unwrap()
    }

    /// Directory with a project, one local-driver pool, one remote-driver
    /// pool and a second cluster member.
    struct Fixture {
        dir: VolumeDirectory,
        local_pool: i64,
        shared_pool: i64,
        member2: i64,
    }

    async fn fixture() -> Fixture {
        let dir = test_directory().await;
        dir.create_project("default").await.unwrap();
        let local_pool = dir.create_storage_pool("pool0", "zfs").await.unwrap();
        let shared_pool = dir.create_storage_pool("tank", "ceph").await.unwrap();
        let member2 = dir.create_node("m2", "10.32.1.2:8443").await.unwrap();
        Fixture { dir, local_pool, shared_pool, member2 }
    }

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    /// Insert a volume record directly, the way pre-migration schemas left
    /// one duplicate per cluster member for volumes on remote storage.
    async fn insert_raw_volume(
        dir: &VolumeDirectory,
        pool_id: i64,
        node_id: Option<i64>,
        name: &str,
    ) -> i64 {
        let result = sqlx::query(
            r#"
            INSERT INTO storage_volumes (id, name, storage_pool_id, node_id, type, description, project_id, content_type)
            VALUES ((SELECT IFNULL(MAX(id), 0) + 1 FROM storage_volumes_all), ?, ?, ?, 'custom', '',
                    (SELECT id FROM projects WHERE name = 'default'), 'filesystem')
            "#,
        )
        .bind(name)
        .bind(pool_id)
        .bind(node_id)
        .execute(dir.pool())
        .await
        .unwrap();

        result.last_insert_rowid()
    }

    async fn raw_description(dir: &VolumeDirectory, volume_id: i64) -> String {
        sqlx::query_scalar("SELECT description FROM storage_volumes WHERE id = ?")
            .bind(volume_id)
            .fetch_one(dir.pool())
            .await
            .unwrap()
    }

    async fn raw_name(dir: &VolumeDirectory, volume_id: i64) -> String {
        sqlx::query_scalar("SELECT name FROM storage_volumes WHERE id = ?")
            .bind(volume_id)
            .fetch_one(dir.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_directory_init() {
        let dir = test_directory().await;
        // Should succeed without errors
        drop(dir);
    }

    #[tokio::test]
    async fn test_create_and_get_volume() {
        let f = fixture().await;

        let volume_id = f
            .dir
            .create_volume(
                "default",
                "web-data",
                "web server data",
                VolumeType::Custom,
                f.local_pool,
                &config(&[("size", "10GiB")]),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
        assert!(volume_id > 0);

        let (resolved_id, volume) =
            f.dir.local_volume("default", "web-data", VolumeType::Custom, f.local_pool).await.unwrap();

        assert_eq!(resolved_id, volume_id);
        assert_eq!(volume.name, "web-data");
        assert_eq!(volume.description, "web server data");
        assert_eq!(volume.config, config(&[("size", "10GiB")]));
        assert_eq!(volume.content_type, ContentType::Filesystem);
        // Local-driver volumes report the member hosting them.
        assert_eq!(volume.location, "local");
    }

    #[tokio::test]
    async fn test_get_volume_not_found() {
        let f = fixture().await;

        let result =
            f.dir.local_volume("default", "missing", VolumeType::Custom, f.local_pool).await;
        assert!(matches!(result, Err(CorralError::VolumeNotFound)));
    }

    #[tokio::test]
    async fn test_create_volume_rejects_snapshot_name() {
        let f = fixture().await;

        let result = f
            .dir
            .create_volume(
                "default",
                "vol/x",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await;
        assert!(matches!(result, Err(CorralError::InvalidVolumeName { .. })));

        // The unqualified name is fine.
        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_classify_pool() {
        let f = fixture().await;

        assert_eq!(f.dir.classify_pool(f.local_pool).await.unwrap(), DriverClass::Local);
        assert_eq!(f.dir.classify_pool(f.shared_pool).await.unwrap(), DriverClass::Remote);
        // Deterministic across calls.
        assert_eq!(f.dir.classify_pool(f.shared_pool).await.unwrap(), DriverClass::Remote);

        let result = f.dir.classify_pool(9999).await;
        assert!(matches!(result, Err(CorralError::PoolNotFound { .. })));

        // Pools are also addressable by name.
        let pool = f.dir.storage_pool("tank").await.unwrap();
        assert_eq!(pool.id, f.shared_pool);
        assert_eq!(pool.driver, "ceph");
    }

    #[tokio::test]
    async fn test_locate_single_records() {
        let f = fixture().await;

        let result = f.dir.locate("default", "missing", VolumeType::Custom, f.local_pool).await;
        assert!(matches!(result, Err(CorralError::VolumeNotFound)));

        let local_id = f
            .dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        let resolution =
            f.dir.locate("default", "vol", VolumeType::Custom, f.local_pool).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Single(VolumeLocation {
                volume_id: local_id,
                node_id: Some(f.dir.node_id())
            })
        );

        // Canonical shared volume: one member-less record.
        let shared_id = f
            .dir
            .create_volume(
                "default",
                "shared",
                "",
                VolumeType::Custom,
                f.shared_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        let resolution =
            f.dir.locate("default", "shared", VolumeType::Custom, f.shared_pool).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Single(VolumeLocation { volume_id: shared_id, node_id: None })
        );
    }

    #[tokio::test]
    async fn test_locate_legacy_duplicates_are_shared() {
        let f = fixture().await;

        insert_raw_volume(&f.dir, f.shared_pool, Some(f.dir.node_id()), "data").await;
        insert_raw_volume(&f.dir, f.shared_pool, Some(f.member2), "data").await;

        let resolution =
            f.dir.locate("default", "data", VolumeType::Custom, f.shared_pool).await.unwrap();
        assert_eq!(resolution, Resolution::SharedNoMember);
    }

    #[tokio::test]
    async fn test_locate_local_multiplicity_is_integrity_fault() {
        let f = fixture().await;

        insert_raw_volume(&f.dir, f.local_pool, Some(f.dir.node_id()), "data").await;
        insert_raw_volume(&f.dir, f.local_pool, Some(f.member2), "data").await;

        let result = f.dir.locate("default", "data", VolumeType::Custom, f.local_pool).await;
        assert!(matches!(result, Err(CorralError::Integrity { .. })));
    }

    #[tokio::test]
    async fn test_update_replicates_across_duplicates() {
        let f = fixture().await;

        let id1 = insert_raw_volume(&f.dir, f.shared_pool, Some(f.dir.node_id()), "data").await;
        let id2 = insert_raw_volume(&f.dir, f.shared_pool, Some(f.member2), "data").await;

        f.dir
            .update_volume(
                "default",
                "data",
                VolumeType::Custom,
                f.shared_pool,
                "new desc",
                &config(&[("size", "5GiB")]),
            )
            .await
            .unwrap();

        for id in [id1, id2] {
            assert_eq!(raw_description(&f.dir, id).await, "new desc");

            let rows = sqlx::query(
                "SELECT key, value FROM storage_volumes_config WHERE storage_volume_id = ?",
            )
            .bind(id)
            .fetch_all(f.dir.pool())
            .await
            .unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].get::<String, _>("key"), "size");
            assert_eq!(rows[0].get::<String, _>("value"), "5GiB");
        }
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_all_duplicates_unchanged() {
        let f = fixture().await;

        let id1 = insert_raw_volume(&f.dir, f.shared_pool, Some(f.dir.node_id()), "data").await;
        let id2 = insert_raw_volume(&f.dir, f.shared_pool, Some(f.member2), "data").await;
        // Occupies the target name on member2 only, so the rename succeeds on
        // the first duplicate and hits the uniqueness constraint on the
        // second.
        insert_raw_volume(&f.dir, f.shared_pool, Some(f.member2), "taken").await;

        let result = f
            .dir
            .rename_volume("default", "data", "taken", VolumeType::Custom, f.shared_pool)
            .await;
        assert!(result.is_err());

        // All-or-nothing: the first duplicate's rename was rolled back.
        assert_eq!(raw_name(&f.dir, id1).await, "data");
        assert_eq!(raw_name(&f.dir, id2).await, "data");
    }

    #[tokio::test]
    async fn test_config_replace_semantics() {
        let f = fixture().await;

        // Empty values are treated as absent.
        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &config(&[("a", "1"), ("b", "")]),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        let (_, volume) =
            f.dir.local_volume("default", "vol", VolumeType::Custom, f.local_pool).await.unwrap();
        assert_eq!(volume.config, config(&[("a", "1")]));

        // Replace, not merge: the second map is exactly what reads back.
        f.dir
            .update_volume(
                "default",
                "vol",
                VolumeType::Custom,
                f.local_pool,
                "",
                &config(&[("c", "2")]),
            )
            .await
            .unwrap();

        let (_, volume) =
            f.dir.local_volume("default", "vol", VolumeType::Custom, f.local_pool).await.unwrap();
        assert_eq!(volume.config, config(&[("c", "2")]));
    }

    #[tokio::test]
    async fn test_snapshot_listing_preserves_creation_order() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        // Created in an order that disagrees with alphabetical order.
        for short_name in ["z", "a", "m"] {
            f.dir
                .create_volume_snapshot(
                    "default",
                    &format!("vol/{}", short_name),
                    VolumeType::Custom,
                    f.local_pool,
                    "",
                    None,
                    &HashMap::new(),
                )
                .await
                .unwrap();
        }

        let snapshots = f
            .dir
            .volume_snapshots("default", "vol", VolumeType::Custom, f.local_pool)
            .await
            .unwrap();

        let names: Vec<&str> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["vol/z", "vol/a", "vol/m"]);
        assert!(snapshots.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[tokio::test]
    async fn test_snapshot_fields_round_trip() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Block,
            )
            .await
            .unwrap();
        f.dir
            .create_volume_snapshot(
                "default",
                "vol/nightly",
                VolumeType::Custom,
                f.local_pool,
                "pre-upgrade state",
                Some(4102444800),
                &config(&[("size", "2GiB")]),
            )
            .await
            .unwrap();

        let snapshots = f
            .dir
            .volume_snapshots("default", "vol", VolumeType::Custom, f.local_pool)
            .await
            .unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].description, "pre-upgrade state");
        assert_eq!(snapshots[0].expiry, Some(4102444800));
        assert_eq!(snapshots[0].config, config(&[("size", "2GiB")]));
        // Snapshots inherit the parent's content type.
        assert_eq!(snapshots[0].content_type, ContentType::Block);
    }

    #[tokio::test]
    async fn test_next_snapshot_index() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        // No snapshots yet.
        let next = f
            .dir
            .next_snapshot_index("pool0", "vol", VolumeType::Custom, "snap%d")
            .await
            .unwrap();
        assert_eq!(next, 0);

        for short_name in ["snap0", "snap2", "other"] {
            f.dir
                .create_volume_snapshot(
                    "default",
                    &format!("vol/{}", short_name),
                    VolumeType::Custom,
                    f.local_pool,
                    "",
                    None,
                    &HashMap::new(),
                )
                .await
                .unwrap();
        }

        let next = f
            .dir
            .next_snapshot_index("pool0", "vol", VolumeType::Custom, "snap%d")
            .await
            .unwrap();
        assert_eq!(next, 3);
    }

    #[tokio::test]
    async fn test_rename_snapshot_replaces_short_name_only() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
        f.dir
            .create_volume_snapshot(
                "default",
                "vol/old",
                VolumeType::Custom,
                f.local_pool,
                "",
                None,
                &HashMap::new(),
            )
            .await
            .unwrap();

        f.dir
            .rename_volume("default", "vol/old", "vol/new", VolumeType::Custom, f.local_pool)
            .await
            .unwrap();

        let snapshots = f
            .dir
            .volume_snapshots("default", "vol", VolumeType::Custom, f.local_pool)
            .await
            .unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].name, "vol/new");

        // The parent volume kept its name.
        f.dir.local_volume("default", "vol", VolumeType::Custom, f.local_pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_snapshot_keeps_parent() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
        f.dir
            .create_volume_snapshot(
                "default",
                "vol/snap0",
                VolumeType::Custom,
                f.local_pool,
                "",
                None,
                &HashMap::new(),
            )
            .await
            .unwrap();

        f.dir
            .remove_volume("default", "vol/snap0", VolumeType::Custom, f.local_pool)
            .await
            .unwrap();

        let snapshots = f
            .dir
            .volume_snapshots("default", "vol", VolumeType::Custom, f.local_pool)
            .await
            .unwrap();
        assert!(snapshots.is_empty());

        f.dir.local_volume("default", "vol", VolumeType::Custom, f.local_pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_volume_cascades_to_snapshots_and_config() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &config(&[("size", "1GiB")]),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
        f.dir
            .create_volume_snapshot(
                "default",
                "vol/snap0",
                VolumeType::Custom,
                f.local_pool,
                "",
                None,
                &HashMap::new(),
            )
            .await
            .unwrap();

        f.dir.remove_volume("default", "vol", VolumeType::Custom, f.local_pool).await.unwrap();

        let result = f.dir.local_volume("default", "vol", VolumeType::Custom, f.local_pool).await;
        assert!(matches!(result, Err(CorralError::VolumeNotFound)));

        let snapshots: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storage_volumes_snapshots")
                .fetch_one(f.dir.pool())
                .await
                .unwrap();
        assert_eq!(snapshots, 0);

        let config_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storage_volumes_config")
            .fetch_one(f.dir.pool())
            .await
            .unwrap();
        assert_eq!(config_rows, 0);
    }

    #[tokio::test]
    async fn test_volume_nodes() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        let nodes =
            f.dir.volume_nodes(f.local_pool, "default", "vol", VolumeType::Custom).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "local");

        // Canonical shared volume: defined without a member.
        f.dir
            .create_volume(
                "default",
                "shared",
                "",
                VolumeType::Custom,
                f.shared_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        let result =
            f.dir.volume_nodes(f.shared_pool, "default", "shared", VolumeType::Custom).await;
        assert!(matches!(result, Err(CorralError::NoClusterMember)));

        let result =
            f.dir.volume_nodes(f.shared_pool, "default", "missing", VolumeType::Custom).await;
        assert!(matches!(result, Err(CorralError::VolumeNotFound)));
    }

    #[tokio::test]
    async fn test_pool_volumes_spans_members_and_fetches_shared_once() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "v1",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
        insert_raw_volume(&f.dir, f.local_pool, Some(f.member2), "v2").await;

        let mut names: Vec<String> = f
            .dir
            .pool_volumes("default", f.local_pool, &[VolumeType::Custom])
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        names.sort();
        assert_eq!(names, ["v1", "v2"]);

        f.dir
            .create_volume(
                "default",
                "v3",
                "",
                VolumeType::Custom,
                f.shared_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        let names: Vec<String> = f
            .dir
            .pool_volumes("default", f.shared_pool, &[VolumeType::Custom])
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, ["v3"]);

        // An empty pool is not an error for the cluster-wide listing.
        let empty_pool = f.dir.create_storage_pool("empty", "zfs").await.unwrap();
        let volumes =
            f.dir.pool_volumes("default", empty_pool, &[VolumeType::Custom]).await.unwrap();
        assert!(volumes.is_empty());

        // But it is for the member-scoped one.
        let result =
            f.dir.local_pool_volumes("default", empty_pool, &[VolumeType::Custom]).await;
        assert!(matches!(result, Err(CorralError::VolumeNotFound)));
    }

    #[tokio::test]
    async fn test_volume_uris() {
        let f = fixture().await;

        f.dir
            .create_volume(
                "default",
                "bound",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
        f.dir
            .create_volume(
                "default",
                "floating",
                "",
                VolumeType::Custom,
                f.shared_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        let mut uris = f.dir.volume_uris("default").await.unwrap();
        uris.sort();
        assert_eq!(
            uris,
            [
                "/1.0/storage-pools/pool0/volumes/custom/bound?project=default&target=local",
                "/1.0/storage-pools/tank/volumes/custom/floating?project=default",
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_image_volumes() {
        let f = fixture().await;

        for fingerprint in ["abc123", "def456"] {
            f.dir
                .create_volume(
                    "default",
                    fingerprint,
                    "",
                    VolumeType::Image,
                    f.local_pool,
                    &HashMap::new(),
                    ContentType::Filesystem,
                )
                .await
                .unwrap();
        }

        f.dir.remove_image_volumes(&["abc123".to_string()]).await.unwrap();

        f.dir.local_volume("default", "abc123", VolumeType::Image, f.local_pool).await.unwrap();
        let result =
            f.dir.local_volume("default", "def456", VolumeType::Image, f.local_pool).await;
        assert!(matches!(result, Err(CorralError::VolumeNotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_config_key_is_integrity_fault() {
        let f = fixture().await;

        let volume_id = f
            .dir
            .create_volume(
                "default",
                "vol",
                "",
                VolumeType::Custom,
                f.local_pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();

        // Simulate a corrupted schema where the uniqueness index is gone and
        // two rows share a key.
        sqlx::query("DROP INDEX idx_storage_volumes_config_key")
            .execute(f.dir.pool())
            .await
            .unwrap();
        for value in ["1", "2"] {
            sqlx::query(
                "INSERT INTO storage_volumes_config (storage_volume_id, key, value) VALUES (?, 'size', ?)",
            )
            .bind(volume_id)
            .bind(value)
            .execute(f.dir.pool())
            .await
            .unwrap();
        }

        let result = f.dir.local_volume("default", "vol", VolumeType::Custom, f.local_pool).await;
        assert!(matches!(result, Err(CorralError::Integrity { .. })));
    }

    #[tokio::test]
    async fn test_volume_record_lookups() {
        let f = fixture().await;

        let volume_id = f
            .dir
            .create_volume(
                "default",
                "vol",
                "some volume",
                VolumeType::Custom,
                f.local_pool,
                &config(&[("size", "1GiB")]),
                ContentType::Block,
            )
            .await
            .unwrap();

        let record = f.dir.volume_with_id(volume_id).await.unwrap();
        assert_eq!(record.name, "vol");
        assert_eq!(record.pool_name, "pool0");
        assert_eq!(record.project, "default");
        assert_eq!(record.description, "some volume");
        assert_eq!(record.config, config(&[("size", "1GiB")]));

        let records = f.dir.volumes_with_type(VolumeType::Custom).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, volume_id);
        assert_eq!(records[0].node_id, Some(f.dir.node_id()));

        let records = f.dir.custom_volumes_in_project("default").await.unwrap();
        assert_eq!(records.len(), 1);

        let names = f.dir.pool_volume_names(f.local_pool).await.unwrap();
        assert_eq!(names, ["vol"]);

        assert!(matches!(f.dir.volume_with_id(9999).await, Err(CorralError::VolumeNotFound)));
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            db_path: temp_dir.path().join("cluster.db").to_string_lossy().to_string(),
            ..Config::default()
        };
        let registry = Arc::new(StaticRemoteDrivers::default());

        {
            let dir = VolumeDirectory::open(&config, registry.clone()).await.unwrap();
            dir.create_project("default").await.unwrap();
            let pool = dir.create_storage_pool("pool0", "zfs").await.unwrap();
            dir.create_volume(
                "default",
                "vol",
                "kept",
                VolumeType::Custom,
                pool,
                &HashMap::new(),
                ContentType::Filesystem,
            )
            .await
            .unwrap();
            dir.pool().close().await;
        }

        // Reopen database
        {
            let dir = VolumeDirectory::open(&config, registry).await.unwrap();
            let (_, volume) =
                dir.local_volume("default", "vol", VolumeType::Custom, 1).await.unwrap();
            assert_eq!(volume.description, "kept");
        }
    }
}
