use std::{collections::BTreeMap, sync::OnceLock};

use log::debug;
use regex::Regex;
use split_iter::Splittable;

use super::{
    error::EngineError,
    filesystem::{from_config_id, FilesystemConfigId, FilesystemType},
    model::{
        ApplicationConfig, BillingConfig, DatabaseConfig, DatabaseTierOverride, FilesystemFields,
        LaunchType, OperatingSystem, PasswordEdit, ServiceConfig, ServiceId, Tier, TierOverride,
        WindowsVersion,
    },
    resolve::{join_maintenance_window, resolve_tier, resolved_tiers, DefaultTier},
    wire::{
        EfsFilesystem, EfsTier, FsxOntapFilesystem, FsxOntapTier, FsxWindowsFilesystem,
        FsxWindowsTier, PersistableConfig, PersistedBilling, PersistedCompute,
        PersistedComputeTier, PersistedDatabase, PersistedDatabaseTier, PersistedFilesystem,
        PersistedObjectStorage, PersistedService,
    },
};

const LINUX: &str = "LINUX";
const WINDOWS: &str = "WINDOWS";

/// Builds the persisted form of an edited configuration.
///
/// Tombstoned services are dropped. Every tier of `tiers` is written for each
/// live service; tiers of a service that does not override defaults copy the
/// default tier.
pub fn to_wire(
    config: &ApplicationConfig,
    tiers: &[Tier],
    default_tier: &DefaultTier,
) -> Result<PersistableConfig, EngineError> {
    let (tombstoned, live) = config.services.iter().split(|service| service.is_live());
    let dropped = tombstoned.count();
    if dropped > 0 {
        debug!("Dropping {} deleted services from submission", dropped);
    }

    let mut services = BTreeMap::new();
    for service in live {
        let persisted = service_to_wire(service, tiers, default_tier)?;
        if services.insert(service.name.clone(), persisted).is_some() {
            return Err(EngineError::Invalid(format!(
                "Service name {} is used more than once",
                service.name
            )));
        }
    }

    Ok(PersistableConfig {
        name: config.name.clone(),
        domain_name: non_empty(&config.domain_name),
        hosted_zone: non_empty(&config.hosted_zone),
        ssl_certificate: non_empty(&config.ssl_certificate),
        services,
        billing: config.provision_billing.then(|| PersistedBilling {
            api_key: config.billing.api_key.clone(),
            plan_id: config.billing.plan_id.clone(),
        }),
    })
}

/// Expands a persisted configuration into the editable form, with every tier
/// of `tiers` resolved against the default tier.
pub fn to_editable(
    wire: &PersistableConfig,
    tiers: &[Tier],
    default_tier: &DefaultTier,
) -> Result<ApplicationConfig, EngineError> {
    let services = wire
        .services
        .values()
        .map(|service| service_to_editable(service, tiers, default_tier))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ApplicationConfig {
        name: wire.name.clone(),
        domain_name: wire.domain_name.clone().unwrap_or_default(),
        hosted_zone: wire.hosted_zone.clone().unwrap_or_default(),
        ssl_certificate: wire.ssl_certificate.clone().unwrap_or_default(),
        services,
        provision_billing: wire.billing.is_some(),
        billing: wire
            .billing
            .as_ref()
            .map(|billing| BillingConfig {
                api_key: billing.api_key.clone(),
                plan_id: billing.plan_id.clone(),
            })
            .unwrap_or_default(),
    })
}

fn service_to_wire(
    service: &ServiceConfig,
    tiers: &[Tier],
    default_tier: &DefaultTier,
) -> Result<PersistedService, EngineError> {
    let field = |name: &str| format!("{}.{}", service.name, name);

    let os = service
        .operating_system
        .ok_or_else(|| EngineError::IncompleteField(field("operatingSystem")))?;
    let operating_system = match os {
        OperatingSystem::Linux => LINUX.to_string(),
        OperatingSystem::Windows => service
            .windows_version
            .ok_or_else(|| EngineError::IncompleteField(field("windowsVersion")))?
            .key()
            .to_string(),
    };
    let ecs_launch_type = match os {
        OperatingSystem::Linux => service.ecs_launch_type.unwrap_or(LaunchType::Fargate),
        OperatingSystem::Windows => LaunchType::Ec2,
    };
    let container_port = service
        .container_port
        .ok_or_else(|| EngineError::IncompleteField(field("containerPort")))?;

    let resolved = resolved_tiers(service, tiers, default_tier);
    let compute_tiers = resolved
        .iter()
        .map(|(name, tier)| {
            (
                name.clone(),
                PersistedComputeTier {
                    min: tier.min.unwrap_or_default(),
                    max: tier.max.unwrap_or_default(),
                    compute_size: tier.compute_size.clone().unwrap_or_default(),
                },
            )
        })
        .collect();

    let filesystem = if service.provision_fs {
        let fs = service
            .filesystem_type
            .ok_or_else(|| EngineError::IncompleteField(field("filesystemType")))?;
        Some(filesystem_to_wire(service, fs, &resolved)?)
    } else {
        None
    };

    let database = if service.provision_db {
        Some(database_to_wire(service, &resolved)?)
    } else {
        None
    };

    debug!(
        "Service {} persisted with os={} launch={:?} filesystem={:?}",
        service.name,
        operating_system,
        ecs_launch_type,
        service.provision_fs.then_some(service.filesystem_type)
    );
    Ok(PersistedService {
        name: service.name.clone(),
        description: service.description.clone(),
        path: service.path.clone(),
        public: service.public,
        health_check_url: service.health_check_url.clone(),
        container_port,
        container_tag: service.container_tag.clone(),
        compute: PersistedCompute {
            operating_system,
            ecs_launch_type,
            ecs_exec_enabled: service.ecs_exec_enabled,
            tiers: compute_tiers,
        },
        filesystem,
        database,
        s3: service
            .provision_object_storage
            .then(PersistedObjectStorage::default),
    })
}

fn filesystem_to_wire(
    service: &ServiceConfig,
    fs: FilesystemType,
    resolved: &BTreeMap<String, TierOverride>,
) -> Result<PersistedFilesystem, EngineError> {
    let mount_point = service.mount_point.clone();
    let filesystem = match fs {
        FilesystemType::Efs => PersistedFilesystem::Efs(EfsFilesystem {
            mount_point,
            tiers: tiers_to_wire(service, resolved, |require, fields| {
                Ok(EfsTier {
                    lifecycle: require.value("lifecycle", &fields.lifecycle)?,
                    encrypt: fields.encrypt.unwrap_or_default(),
                })
            })?,
        }),
        FilesystemType::FsxWindows => PersistedFilesystem::FsxWindows(FsxWindowsFilesystem {
            mount_point,
            tiers: tiers_to_wire(service, resolved, |require, fields| {
                Ok(FsxWindowsTier {
                    storage_gb: require.value("storageGb", &fields.storage_gb)?,
                    throughput_mbs: require.value("throughputMbs", &fields.throughput_mbs)?,
                    backup_retention_days: require
                        .value("backupRetentionDays", &fields.backup_retention_days)?,
                    daily_backup_time: require.value("dailyBackupTime", &fields.daily_backup_time)?,
                    weekly_maintenance_time: require.maintenance_window(fields)?,
                    windows_mount_drive: require
                        .value("windowsMountDrive", &fields.windows_mount_drive)?,
                })
            })?,
        }),
        FilesystemType::FsxOntapLinux | FilesystemType::FsxOntapWindows => {
            PersistedFilesystem::FsxOntap(FsxOntapFilesystem {
                mount_point,
                tiers: tiers_to_wire(service, resolved, |require, fields| {
                    let windows_mount_drive = if fs == FilesystemType::FsxOntapWindows {
                        Some(require.value("windowsMountDrive", &fields.windows_mount_drive)?)
                    } else {
                        None
                    };
                    Ok(FsxOntapTier {
                        storage_gb: require.value("storageGb", &fields.storage_gb)?,
                        throughput_mbs: require.value("throughputMbs", &fields.throughput_mbs)?,
                        volume_size: require.value("volumeSize", &fields.volume_size)?,
                        backup_retention_days: require
                            .value("backupRetentionDays", &fields.backup_retention_days)?,
                        daily_backup_time: require
                            .value("dailyBackupTime", &fields.daily_backup_time)?,
                        weekly_maintenance_time: require.maintenance_window(fields)?,
                        windows_mount_drive,
                    })
                })?,
            })
        }
    };
    Ok(filesystem)
}

/// Names the tier field a missing value belongs to.
struct Require<'a> {
    service: &'a str,
    tier: &'a str,
}

impl Require<'_> {
    fn value<T: Clone>(&self, field: &str, value: &Option<T>) -> Result<T, EngineError> {
        value.clone().ok_or_else(|| {
            EngineError::IncompleteField(format!(
                "{}.tiers.{}.filesystem.{}",
                self.service, self.tier, field
            ))
        })
    }

    fn maintenance_window(&self, fields: &FilesystemFields) -> Result<String, EngineError> {
        let day = self.value("weeklyMaintenanceDay", &fields.weekly_maintenance_day)?;
        let time = self.value("weeklyMaintenanceTime", &fields.weekly_maintenance_time)?;
        Ok(join_maintenance_window(&day, &time))
    }
}

fn tiers_to_wire<T>(
    service: &ServiceConfig,
    resolved: &BTreeMap<String, TierOverride>,
    convert: impl Fn(&Require<'_>, &FilesystemFields) -> Result<T, EngineError>,
) -> Result<BTreeMap<String, T>, EngineError> {
    resolved
        .iter()
        .map(|(name, tier)| {
            let require = Require {
                service: &service.name,
                tier: name,
            };
            Ok::<_, EngineError>((name.clone(), convert(&require, &tier.filesystem)?))
        })
        .collect()
}

fn database_to_wire(
    service: &ServiceConfig,
    resolved: &BTreeMap<String, TierOverride>,
) -> Result<PersistedDatabase, EngineError> {
    let db = &service.database;
    let password = match &db.password {
        PasswordEdit::Unchanged => db.encrypted_password.clone().ok_or_else(|| {
            EngineError::IncompleteField(format!("{}.database.password", service.name))
        })?,
        PasswordEdit::Plaintext(value) => value.clone(),
        PasswordEdit::Cleared => String::new(),
    };
    let tiers = resolved
        .iter()
        .map(|(name, tier)| {
            let instance = tier.database.instance.clone().ok_or_else(|| {
                EngineError::IncompleteField(format!(
                    "{}.tiers.{}.database.instance",
                    service.name, name
                ))
            })?;
            Ok::<_, EngineError>((name.clone(), PersistedDatabaseTier { instance }))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(PersistedDatabase {
        engine: db.engine.clone(),
        version: db.version.clone(),
        family: db.family.clone(),
        username: db.username.clone(),
        password,
        database: db.database.clone(),
        bootstrap_filename: db.bootstrap_filename.clone(),
        tiers,
    })
}

fn service_to_editable(
    wire: &PersistedService,
    tiers: &[Tier],
    default_tier: &DefaultTier,
) -> Result<ServiceConfig, EngineError> {
    let (operating_system, windows_version) = parse_operating_system(&wire.compute.operating_system)?;
    let filesystem_type = wire
        .filesystem
        .as_ref()
        .map(|fs| from_config_id(persisted_config_id(fs), operating_system));

    let raw_tier = |name: &str| TierOverride {
        compute_size: wire.compute.tiers.get(name).map(|t| t.compute_size.clone()),
        min: wire.compute.tiers.get(name).map(|t| t.min),
        max: wire.compute.tiers.get(name).map(|t| t.max),
        filesystem_type: None,
        filesystem: wire
            .filesystem
            .as_ref()
            .map(|fs| persisted_tier_fields(fs, name))
            .unwrap_or_default(),
        database: DatabaseTierOverride {
            instance: wire
                .database
                .as_ref()
                .and_then(|db| db.tiers.get(name))
                .map(|t| t.instance.clone()),
        },
    };

    let default_resolved = resolve_tier(
        &raw_tier(default_tier.name()),
        &TierOverride::default(),
        filesystem_type,
    );
    let resolved: BTreeMap<String, TierOverride> = tiers
        .iter()
        .map(|tier| {
            let resolved = if tier.name == default_tier.name() {
                default_resolved.clone()
            } else {
                resolve_tier(&raw_tier(&tier.name), &default_resolved, filesystem_type)
            };
            (tier.name.clone(), resolved)
        })
        .collect();
    let override_defaults = resolved.values().any(|tier| *tier != default_resolved);
    debug!(
        "Service {} loaded with {} tiers, override defaults {}",
        wire.name,
        resolved.len(),
        override_defaults
    );

    Ok(ServiceConfig {
        id: ServiceId::new(),
        name: wire.name.clone(),
        description: wire.description.clone(),
        path: wire.path.clone(),
        public: wire.public,
        health_check_url: wire.health_check_url.clone(),
        container_port: Some(wire.container_port),
        container_tag: wire.container_tag.clone(),
        operating_system: Some(operating_system),
        windows_version,
        ecs_launch_type: Some(wire.compute.ecs_launch_type),
        ecs_exec_enabled: wire.compute.ecs_exec_enabled,
        filesystem_type,
        mount_point: wire
            .filesystem
            .as_ref()
            .map(|fs| fs.mount_point().to_string())
            .unwrap_or_default(),
        provision_fs: wire.filesystem.is_some(),
        provision_db: wire.database.is_some(),
        provision_object_storage: wire.s3.is_some(),
        override_defaults,
        database: wire
            .database
            .as_ref()
            .map(database_to_editable)
            .unwrap_or_default(),
        tiers: resolved,
        tombstone: false,
    })
}

/// A bare `WINDOWS` loads with no version, leaving validation to ask for one.
fn parse_operating_system(
    value: &str,
) -> Result<(OperatingSystem, Option<WindowsVersion>), EngineError> {
    match value {
        LINUX => return Ok((OperatingSystem::Linux, None)),
        WINDOWS => return Ok((OperatingSystem::Windows, None)),
        _ => {}
    }
    WindowsVersion::from_key(value)
        .map(|version| (OperatingSystem::Windows, Some(version)))
        .ok_or_else(|| EngineError::Invalid(format!("Unknown operating system {value}")))
}

fn persisted_config_id(fs: &PersistedFilesystem) -> FilesystemConfigId {
    match fs {
        PersistedFilesystem::Efs(_) => FilesystemConfigId::Efs,
        PersistedFilesystem::FsxWindows(_) => FilesystemConfigId::FsxWindows,
        PersistedFilesystem::FsxOntap(_) => FilesystemConfigId::FsxOntap,
    }
}

/// Editable fields of one persisted tier. The maintenance window stays
/// combined; resolution splits it.
fn persisted_tier_fields(fs: &PersistedFilesystem, tier: &str) -> FilesystemFields {
    match fs {
        PersistedFilesystem::Efs(efs) => efs
            .tiers
            .get(tier)
            .map(|t| FilesystemFields {
                lifecycle: Some(t.lifecycle),
                encrypt: Some(t.encrypt),
                ..Default::default()
            })
            .unwrap_or_default(),
        PersistedFilesystem::FsxWindows(fsx) => fsx
            .tiers
            .get(tier)
            .map(|t| FilesystemFields {
                storage_gb: Some(t.storage_gb),
                throughput_mbs: Some(t.throughput_mbs),
                backup_retention_days: Some(t.backup_retention_days),
                daily_backup_time: Some(t.daily_backup_time.clone()),
                weekly_maintenance_time: Some(t.weekly_maintenance_time.clone()),
                windows_mount_drive: Some(t.windows_mount_drive.clone()),
                ..Default::default()
            })
            .unwrap_or_default(),
        PersistedFilesystem::FsxOntap(ontap) => ontap
            .tiers
            .get(tier)
            .map(|t| FilesystemFields {
                storage_gb: Some(t.storage_gb),
                throughput_mbs: Some(t.throughput_mbs),
                volume_size: Some(t.volume_size),
                backup_retention_days: Some(t.backup_retention_days),
                daily_backup_time: Some(t.daily_backup_time.clone()),
                weekly_maintenance_time: Some(t.weekly_maintenance_time.clone()),
                windows_mount_drive: t.windows_mount_drive.clone(),
                ..Default::default()
            })
            .unwrap_or_default(),
    }
}

fn database_to_editable(db: &PersistedDatabase) -> DatabaseConfig {
    let (password, encrypted_password) = if db.password.is_empty() {
        (PasswordEdit::Cleared, None)
    } else if looks_encrypted(&db.password) {
        (PasswordEdit::Unchanged, Some(db.password.clone()))
    } else {
        (PasswordEdit::Plaintext(db.password.clone()), None)
    };
    DatabaseConfig {
        engine: db.engine.clone(),
        version: db.version.clone(),
        family: db.family.clone(),
        username: db.username.clone(),
        password,
        encrypted_password,
        database: db.database.clone(),
        bootstrap_filename: db.bootstrap_filename.clone(),
    }
}

/// Server-encrypted passwords come back base64 encoded.
fn looks_encrypted(password: &str) -> bool {
    static BASE64: OnceLock<Regex> = OnceLock::new();
    let base64 = BASE64.get_or_init(|| Regex::new(r"^[A-Za-z0-9=+/\s]+$").unwrap());
    base64.is_match(password)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
