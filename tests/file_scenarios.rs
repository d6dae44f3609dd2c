use map_macro::btree_map;
use serde_json::json;
use tempfile::TempDir;
use tierconf::{
    domain::{
        filesystem::FilesystemType,
        model::{LaunchType, TierOverride},
        options::DbCatalog,
        port::SettingsStore,
        wire::PersistedComputeTier,
    },
    infra::file_store::FileSettingsStore,
    EditSession, EngineError,
};

fn write_fixture(dir: &TempDir, config: serde_json::Value) -> FileSettingsStore {
    let store = FileSettingsStore {
        settings_file: dir.path().join("appconfig.json"),
        tiers_file: dir.path().join("tiers.json"),
    };
    std::fs::write(&store.settings_file, config.to_string()).unwrap();
    std::fs::write(
        &store.tiers_file,
        json!([
            {"name": "free", "defaultTier": true, "description": "Free"},
            {"name": "gold", "defaultTier": false, "description": "Gold"}
        ])
        .to_string(),
    )
    .unwrap();
    store
}

fn linux_app() -> serde_json::Value {
    json!({
        "name": "shop",
        "domainName": "shop.example.com",
        "services": {
            "api": {
                "name": "api",
                "path": "/api",
                "public": true,
                "healthCheckUrl": "/health",
                "containerPort": 8080,
                "containerTag": "v1",
                "compute": {
                    "operatingSystem": "LINUX",
                    "ecsLaunchType": "FARGATE",
                    "tiers": {
                        "free": {"min": 1, "max": 3, "computeSize": "M"}
                    }
                }
            }
        }
    })
}

#[tokio::test]
async fn gold_override_only_changes_compute_size() {
    let dir = TempDir::new().unwrap();
    let store = write_fixture(&dir, linux_app());
    let settings_file = store.settings_file.clone();
    let mut session = EditSession::load(Box::new(store), DbCatalog::default())
        .await
        .unwrap();
    let id = session.config().services[0].id;

    // Freshly loaded gold mirrors free.
    assert!(!session.config().services[0].override_defaults);

    session.service_mut(id).unwrap().override_defaults = true;
    *session.tier_mut(id, "gold").unwrap() = TierOverride {
        compute_size: Some("L".to_string()),
        ..Default::default()
    };
    let gold = session.resolved_tier(id, "gold").unwrap();
    assert_eq!(gold.compute_size.as_deref(), Some("L"));
    assert_eq!((gold.min, gold.max), (Some(1), Some(3)));

    session.submit().await.unwrap();

    let stored = FileSettingsStore {
        settings_file,
        tiers_file: dir.path().join("tiers.json"),
    }
    .fetch_config()
    .await
    .unwrap();
    let api = &stored.services["api"];
    assert_eq!(
        api.compute.tiers,
        btree_map! {
            "free".to_string() => PersistedComputeTier { min: 1, max: 3, compute_size: "M".to_string() },
            "gold".to_string() => PersistedComputeTier { min: 1, max: 3, compute_size: "L".to_string() }
        }
    );
    assert_eq!(api.compute.ecs_launch_type, LaunchType::Fargate);
    assert_eq!(api.filesystem, None);
    assert_eq!(stored.domain_name.as_deref(), Some("shop.example.com"));
}

#[tokio::test]
async fn deep_efs_mount_point_blocks_submission() {
    let dir = TempDir::new().unwrap();
    let store = write_fixture(&dir, linux_app());
    let mut session = EditSession::load(Box::new(store), DbCatalog::default())
        .await
        .unwrap();
    let id = session.config().services[0].id;

    let service = session.service_mut(id).unwrap();
    service.provision_fs = true;
    service.mount_point = "/mnt/data/a/b/c".to_string();
    session
        .select_filesystem_type(id, FilesystemType::Efs)
        .unwrap();

    let report = session.validate();
    assert_eq!(
        report.error_at("services[0].mountPoint"),
        Some("The path can only include up to four subdirectories")
    );
    assert!(matches!(session.submit().await, Err(EngineError::Invalid(_))));
    assert_eq!(session.error(), Some("Errors in form: Service api"));

    session.service_mut(id).unwrap().mount_point = "/mnt/data".to_string();
    session.submit().await.unwrap();
    assert_eq!(session.error(), None);
}

#[tokio::test]
async fn windows_service_is_stored_for_ec2() {
    let dir = TempDir::new().unwrap();
    let mut app = linux_app();
    app["services"]["api"]["compute"]["operatingSystem"] = json!("WIN_2019_FULL");
    app["services"]["api"]["filesystem"] = json!({
        "type": "FSX_WINDOWS",
        "mountPoint": "C:\\data",
        "tiers": {
            "free": {
                "storageGb": 64,
                "throughputMbs": 16,
                "backupRetentionDays": 10,
                "dailyBackupTime": "02:00",
                "weeklyMaintenanceTime": "3:07:01",
                "windowsMountDrive": "H:"
            }
        }
    });
    let store = write_fixture(&dir, app);
    let session = EditSession::load(Box::new(store), DbCatalog::default())
        .await
        .unwrap();
    let api = &session.config().services[0];
    assert_eq!(api.filesystem_type, Some(FilesystemType::FsxWindows));
    let free = &api.tiers["free"].filesystem;
    assert_eq!(free.weekly_maintenance_day.as_deref(), Some("3"));
    assert_eq!(free.weekly_maintenance_time.as_deref(), Some("07:01"));
    assert!(session.validate().is_valid(), "{:?}", session.validate().violations());

    let wire = session.normalized().unwrap();
    let api = &wire.services["api"];
    assert_eq!(api.compute.ecs_launch_type, LaunchType::Ec2);
    assert_eq!(api.compute.operating_system, "WIN_2019_FULL");
    let value = serde_json::to_value(&api.filesystem).unwrap();
    assert_eq!(value["tiers"]["gold"]["weeklyMaintenanceTime"], "3:07:01");
    assert_eq!(value["tiers"]["gold"]["windowsMountDrive"], "H:");
    assert!(value["tiers"]["free"].get("lifecycle").is_none());
}
