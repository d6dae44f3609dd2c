use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::filesystem::FilesystemType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatingSystem {
    Linux,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowsVersion {
    #[serde(rename = "WIN_2016_FULL")]
    Win2016Full,
    #[serde(rename = "WIN_2019_FULL")]
    Win2019Full,
    #[serde(rename = "WIN_2019_CORE")]
    Win2019Core,
    #[serde(rename = "WIN_2022_FULL")]
    Win2022Full,
    #[serde(rename = "WIN_2022_CORE")]
    Win2022Core,
    #[serde(rename = "WIN_20H2_CORE")]
    Win20H2Core,
}

impl WindowsVersion {
    pub const ALL: [WindowsVersion; 6] = [
        WindowsVersion::Win2016Full,
        WindowsVersion::Win2019Full,
        WindowsVersion::Win2019Core,
        WindowsVersion::Win2022Full,
        WindowsVersion::Win2022Core,
        WindowsVersion::Win20H2Core,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Win2016Full => "WIN_2016_FULL",
            Self::Win2019Full => "WIN_2019_FULL",
            Self::Win2019Core => "WIN_2019_CORE",
            Self::Win2022Full => "WIN_2022_FULL",
            Self::Win2022Core => "WIN_2022_CORE",
            Self::Win20H2Core => "WIN_20H2_CORE",
        }
    }

    pub fn from_key(key: &str) -> Option<WindowsVersion> {
        Self::ALL.into_iter().find(|version| version.key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LaunchType {
    Ec2,
    Fargate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EfsLifecycle {
    #[serde(rename = "NEVER")]
    Never,
    #[serde(rename = "AFTER_7_DAYS")]
    After7Days,
    #[serde(rename = "AFTER_14_DAYS")]
    After14Days,
    #[serde(rename = "AFTER_30_DAYS")]
    After30Days,
    #[serde(rename = "AFTER_60_DAYS")]
    After60Days,
    #[serde(rename = "AFTER_90_DAYS")]
    After90Days,
}

/// A customer-facing service level supplied by the tier management side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub name: String,
    #[serde(default)]
    pub default_tier: bool,
    #[serde(default)]
    pub description: String,
}

/// Editable filesystem settings of one tier.
///
/// Holds the union of every variant's fields so switching the variant in the
/// editor does not lose input. Only the fields of the selected variant are
/// ever persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilesystemFields {
    pub lifecycle: Option<EfsLifecycle>,
    pub encrypt: Option<bool>,
    pub storage_gb: Option<i64>,
    pub throughput_mbs: Option<i64>,
    pub backup_retention_days: Option<i64>,
    pub daily_backup_time: Option<String>,
    pub weekly_maintenance_day: Option<String>,
    pub weekly_maintenance_time: Option<String>,
    pub windows_mount_drive: Option<String>,
    pub volume_size: Option<i64>,
}

impl FilesystemFields {
    /// Field-wise merge: values present in `self` win, the rest come from `base`.
    pub fn over(&self, base: &FilesystemFields) -> FilesystemFields {
        FilesystemFields {
            lifecycle: self.lifecycle.or(base.lifecycle),
            encrypt: self.encrypt.or(base.encrypt),
            storage_gb: self.storage_gb.or(base.storage_gb),
            throughput_mbs: self.throughput_mbs.or(base.throughput_mbs),
            backup_retention_days: self.backup_retention_days.or(base.backup_retention_days),
            daily_backup_time: self
                .daily_backup_time
                .clone()
                .or_else(|| base.daily_backup_time.clone()),
            weekly_maintenance_day: self
                .weekly_maintenance_day
                .clone()
                .or_else(|| base.weekly_maintenance_day.clone()),
            weekly_maintenance_time: self
                .weekly_maintenance_time
                .clone()
                .or_else(|| base.weekly_maintenance_time.clone()),
            windows_mount_drive: self
                .windows_mount_drive
                .clone()
                .or_else(|| base.windows_mount_drive.clone()),
            volume_size: self.volume_size.or(base.volume_size),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FilesystemFields::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseTierOverride {
    pub instance: Option<String>,
}

/// Partial per-tier settings of a service. Absent fields are taken from the
/// default tier during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TierOverride {
    pub compute_size: Option<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub filesystem_type: Option<FilesystemType>,
    pub filesystem: FilesystemFields,
    pub database: DatabaseTierOverride,
}

/// Password as seen by the edit surface.
///
/// The surface flips the state on user interaction, so no guessing is needed
/// at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum PasswordEdit {
    /// Keep the encrypted value received from the server.
    Unchanged,
    Plaintext(String),
    #[default]
    Cleared,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub engine: String,
    pub version: String,
    pub family: String,
    pub username: String,
    pub password: PasswordEdit,
    pub encrypted_password: Option<String>,
    pub database: String,
    pub bootstrap_filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(Uuid);

impl ServiceId {
    pub fn new() -> Self {
        ServiceId(Uuid::new_v4())
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub id: ServiceId,
    pub name: String,
    pub description: String,
    pub path: String,
    pub public: bool,
    pub health_check_url: String,
    pub container_port: Option<i64>,
    pub container_tag: String,
    pub operating_system: Option<OperatingSystem>,
    pub windows_version: Option<WindowsVersion>,
    pub ecs_launch_type: Option<LaunchType>,
    pub ecs_exec_enabled: bool,
    pub filesystem_type: Option<FilesystemType>,
    pub mount_point: String,
    pub provision_fs: bool,
    pub provision_db: bool,
    pub provision_object_storage: bool,
    pub override_defaults: bool,
    pub database: DatabaseConfig,
    pub tiers: BTreeMap<String, TierOverride>,
    pub tombstone: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id: ServiceId::new(),
            name: String::new(),
            description: String::new(),
            path: String::new(),
            public: true,
            health_check_url: "/index.html".to_string(),
            container_port: Some(80),
            container_tag: "latest".to_string(),
            operating_system: None,
            windows_version: None,
            ecs_launch_type: None,
            ecs_exec_enabled: false,
            filesystem_type: None,
            mount_point: String::new(),
            provision_fs: false,
            provision_db: false,
            provision_object_storage: false,
            override_defaults: false,
            database: DatabaseConfig::default(),
            tiers: BTreeMap::new(),
            tombstone: false,
        }
    }
}

impl ServiceConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_live(&self) -> bool {
        !self.tombstone
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingConfig {
    pub api_key: String,
    pub plan_id: String,
}

/// Editable application configuration.
///
/// Services live in ordered slots addressed by [`ServiceId`]. Deleting a
/// service only flags its slot, so ids and positions stay stable for the
/// whole edit session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationConfig {
    pub name: String,
    pub domain_name: String,
    pub hosted_zone: String,
    pub ssl_certificate: String,
    pub services: Vec<ServiceConfig>,
    pub provision_billing: bool,
    pub billing: BillingConfig,
}

impl ApplicationConfig {
    pub fn service(&self, id: ServiceId) -> Option<&ServiceConfig> {
        self.services.iter().find(|service| service.id == id)
    }

    pub fn service_mut(&mut self, id: ServiceId) -> Option<&mut ServiceConfig> {
        self.services.iter_mut().find(|service| service.id == id)
    }

    pub fn live_services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter().filter(|service| service.is_live())
    }
}
