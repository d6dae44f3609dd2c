//! Canonical shape exchanged with the settings persistence side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{EfsLifecycle, LaunchType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistableConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_certificate: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, PersistedService>,
    #[serde(default)]
    pub billing: Option<PersistedBilling>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBilling {
    pub api_key: String,
    #[serde(default)]
    pub plan_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedService {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub public: bool,
    pub health_check_url: String,
    pub container_port: i64,
    #[serde(default)]
    pub container_tag: String,
    pub compute: PersistedCompute,
    #[serde(default)]
    pub filesystem: Option<PersistedFilesystem>,
    #[serde(default)]
    pub database: Option<PersistedDatabase>,
    #[serde(default)]
    pub s3: Option<PersistedObjectStorage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCompute {
    /// `LINUX` or a Windows version key such as `WIN_2019_FULL`.
    pub operating_system: String,
    pub ecs_launch_type: LaunchType,
    #[serde(default)]
    pub ecs_exec_enabled: bool,
    #[serde(default)]
    pub tiers: BTreeMap<String, PersistedComputeTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedComputeTier {
    pub min: i64,
    pub max: i64,
    pub compute_size: String,
}

/// Persisted filesystem, tagged by the variant's config id. Every tier of a
/// service carries settings of the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PersistedFilesystem {
    #[serde(rename = "EFS")]
    Efs(EfsFilesystem),
    #[serde(rename = "FSX_WINDOWS")]
    FsxWindows(FsxWindowsFilesystem),
    #[serde(rename = "FSX_ONTAP")]
    FsxOntap(FsxOntapFilesystem),
}

impl PersistedFilesystem {
    pub fn mount_point(&self) -> &str {
        match self {
            Self::Efs(fs) => &fs.mount_point,
            Self::FsxWindows(fs) => &fs.mount_point,
            Self::FsxOntap(fs) => &fs.mount_point,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfsFilesystem {
    pub mount_point: String,
    #[serde(default)]
    pub tiers: BTreeMap<String, EfsTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfsTier {
    pub lifecycle: EfsLifecycle,
    #[serde(default)]
    pub encrypt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsxWindowsFilesystem {
    pub mount_point: String,
    #[serde(default)]
    pub tiers: BTreeMap<String, FsxWindowsTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsxWindowsTier {
    pub storage_gb: i64,
    pub throughput_mbs: i64,
    pub backup_retention_days: i64,
    pub daily_backup_time: String,
    /// Combined `d:HH:MM`.
    pub weekly_maintenance_time: String,
    pub windows_mount_drive: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsxOntapFilesystem {
    pub mount_point: String,
    #[serde(default)]
    pub tiers: BTreeMap<String, FsxOntapTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsxOntapTier {
    pub storage_gb: i64,
    pub throughput_mbs: i64,
    pub volume_size: i64,
    pub backup_retention_days: i64,
    pub daily_backup_time: String,
    pub weekly_maintenance_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_mount_drive: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDatabase {
    pub engine: String,
    pub version: String,
    #[serde(default)]
    pub family: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub bootstrap_filename: String,
    #[serde(default)]
    pub tiers: BTreeMap<String, PersistedDatabaseTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDatabaseTier {
    pub instance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedObjectStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filesystem_is_tagged_by_config_id() {
        let raw = json!({
            "type": "FSX_ONTAP",
            "mountPoint": "/mnt/ontap",
            "tiers": {
                "gold": {
                    "storageGb": 2048,
                    "throughputMbs": 256,
                    "volumeSize": 10,
                    "backupRetentionDays": 7,
                    "dailyBackupTime": "01:00",
                    "weeklyMaintenanceTime": "2:03:00"
                }
            }
        });
        let fs: PersistedFilesystem = serde_json::from_value(raw).unwrap();
        assert_eq!(fs.mount_point(), "/mnt/ontap");
        match fs {
            PersistedFilesystem::FsxOntap(ontap) => {
                assert_eq!(ontap.tiers["gold"].volume_size, 10);
                assert_eq!(ontap.tiers["gold"].windows_mount_drive, None);
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn efs_serializes_without_fsx_fields() {
        let fs = PersistedFilesystem::Efs(EfsFilesystem {
            mount_point: "/mnt".to_string(),
            tiers: BTreeMap::from([(
                "free".to_string(),
                EfsTier {
                    lifecycle: EfsLifecycle::After30Days,
                    encrypt: true,
                },
            )]),
        });
        let value = serde_json::to_value(&fs).unwrap();
        assert_eq!(value["type"], "EFS");
        assert_eq!(value["tiers"]["free"]["lifecycle"], "AFTER_30_DAYS");
        assert!(value["tiers"]["free"].get("storageGb").is_none());
    }
}
