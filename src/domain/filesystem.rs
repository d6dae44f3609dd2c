use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    error::EngineError,
    model::{EfsLifecycle, FilesystemFields, LaunchType, OperatingSystem},
};

/// Filesystem variants the editor can offer.
///
/// Both Ontap variants persist under the same [`FilesystemConfigId`]; which
/// one is meant is decided by the service's operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilesystemType {
    #[serde(rename = "EFS")]
    Efs,
    #[serde(rename = "FSX_WINDOWS")]
    FsxWindows,
    #[serde(rename = "FSX_ONTAP_LINUX")]
    FsxOntapLinux,
    #[serde(rename = "FSX_ONTAP_WINDOWS")]
    FsxOntapWindows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilesystemConfigId {
    #[serde(rename = "EFS")]
    Efs,
    #[serde(rename = "FSX_WINDOWS")]
    FsxWindows,
    #[serde(rename = "FSX_ONTAP")]
    FsxOntap,
}

// Ontap on Linux stays registered but is not offered until it is released.
const LINUX_TYPES: [FilesystemType; 1] = [FilesystemType::Efs];
const WINDOWS_TYPES: [FilesystemType; 2] =
    [FilesystemType::FsxWindows, FilesystemType::FsxOntapWindows];

pub const EFS_MAX_SUBDIRECTORIES: usize = 4;
pub const ONTAP_THROUGHPUT_STEPS: [i64; 5] = [128, 256, 512, 1024, 2048];

/// How the filesystem type is chosen for an operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemSelection {
    /// Exactly one variant exists; it is selected without asking.
    Fixed(FilesystemType),
    Choice(&'static [FilesystemType]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

pub fn available_types(os: OperatingSystem) -> &'static [FilesystemType] {
    match os {
        OperatingSystem::Linux => &LINUX_TYPES,
        OperatingSystem::Windows => &WINDOWS_TYPES,
    }
}

pub fn selection_for(
    os: OperatingSystem,
    launch_type: Option<LaunchType>,
) -> Result<FilesystemSelection, EngineError> {
    let types = available_types(os);
    if !types.iter().any(|fs| fs.enabled(os, launch_type)) {
        return Err(EngineError::NoFilesystemType { os, launch_type });
    }
    match types {
        [single] => Ok(FilesystemSelection::Fixed(*single)),
        _ => Ok(FilesystemSelection::Choice(types)),
    }
}

pub fn from_config_id(config_id: FilesystemConfigId, os: OperatingSystem) -> FilesystemType {
    match (config_id, os) {
        (FilesystemConfigId::Efs, _) => FilesystemType::Efs,
        (FilesystemConfigId::FsxWindows, _) => FilesystemType::FsxWindows,
        (FilesystemConfigId::FsxOntap, OperatingSystem::Linux) => FilesystemType::FsxOntapLinux,
        (FilesystemConfigId::FsxOntap, OperatingSystem::Windows) => FilesystemType::FsxOntapWindows,
    }
}

impl FilesystemType {
    pub const ALL: [FilesystemType; 4] = [
        FilesystemType::Efs,
        FilesystemType::FsxWindows,
        FilesystemType::FsxOntapLinux,
        FilesystemType::FsxOntapWindows,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Efs => "EFS",
            Self::FsxWindows => "FSX_WINDOWS",
            Self::FsxOntapLinux => "FSX_ONTAP_LINUX",
            Self::FsxOntapWindows => "FSX_ONTAP_WINDOWS",
        }
    }

    pub fn config_id(&self) -> FilesystemConfigId {
        match self {
            Self::Efs => FilesystemConfigId::Efs,
            Self::FsxWindows => FilesystemConfigId::FsxWindows,
            Self::FsxOntapLinux | Self::FsxOntapWindows => FilesystemConfigId::FsxOntap,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Efs => "EFS",
            Self::FsxWindows => "FSX Windows",
            Self::FsxOntapLinux | Self::FsxOntapWindows => "FSX Ontap",
        }
    }

    pub fn operating_system(&self) -> OperatingSystem {
        match self {
            Self::Efs | Self::FsxOntapLinux => OperatingSystem::Linux,
            Self::FsxWindows | Self::FsxOntapWindows => OperatingSystem::Windows,
        }
    }

    /// Whether the variant can be picked for the given OS and launch type.
    pub fn enabled(&self, os: OperatingSystem, launch_type: Option<LaunchType>) -> bool {
        if self.operating_system() != os {
            return false;
        }
        match self {
            // Ontap volumes can only be attached to EC2 container instances.
            Self::FsxOntapLinux => launch_type == Some(LaunchType::Ec2),
            Self::Efs | Self::FsxWindows | Self::FsxOntapWindows => true,
        }
    }

    pub fn defaults(&self) -> FilesystemFields {
        match self {
            Self::Efs => FilesystemFields {
                lifecycle: Some(EfsLifecycle::Never),
                encrypt: Some(false),
                ..Default::default()
            },
            Self::FsxWindows => FilesystemFields {
                storage_gb: Some(32),
                throughput_mbs: Some(8),
                backup_retention_days: Some(7),
                daily_backup_time: Some("01:00".to_string()),
                weekly_maintenance_day: Some("1".to_string()),
                weekly_maintenance_time: Some("07:01".to_string()),
                windows_mount_drive: Some("G:".to_string()),
                ..Default::default()
            },
            Self::FsxOntapLinux | Self::FsxOntapWindows => FilesystemFields {
                storage_gb: Some(1024),
                throughput_mbs: Some(128),
                volume_size: Some(40),
                backup_retention_days: Some(7),
                daily_backup_time: Some("01:00".to_string()),
                weekly_maintenance_day: Some("1".to_string()),
                weekly_maintenance_time: Some("07:01".to_string()),
                windows_mount_drive: if *self == Self::FsxOntapWindows {
                    Some("G:".to_string())
                } else {
                    None
                },
                ..Default::default()
            },
        }
    }

    pub fn validate_mount_point(&self, mount_point: &str) -> Option<String> {
        if mount_point.is_empty() {
            return Some("Mount point is a required field".to_string());
        }
        match self.operating_system() {
            OperatingSystem::Linux => validate_linux_mount_point(mount_point),
            OperatingSystem::Windows => {
                if is_windows_path(mount_point) {
                    None
                } else {
                    Some("Invalid path. Ex: C:\\data".to_string())
                }
            }
        }
    }

    /// Checks the tier-level fields owned by this variant. Fields of other
    /// variants are ignored.
    pub fn validate_tier(&self, fields: &FilesystemFields) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match self {
            Self::Efs => {
                if fields.lifecycle.is_none() {
                    errors.push(FieldError::new("lifecycle", "Lifecycle is required"));
                }
            }
            Self::FsxWindows => {
                check_range(&mut errors, "storageGb", fields.storage_gb, 32, 1048, "Storage", "GB");
                check_range(
                    &mut errors,
                    "throughputMbs",
                    fields.throughput_mbs,
                    8,
                    2048,
                    "Throughput",
                    "MB/s",
                );
                check_backups(&mut errors, fields);
                check_drive(&mut errors, fields);
            }
            Self::FsxOntapLinux | Self::FsxOntapWindows => {
                match fields.storage_gb {
                    None => errors.push(FieldError::new("storageGb", "Storage is required")),
                    Some(gb) if gb % 1024 != 0 => errors.push(FieldError::new(
                        "storageGb",
                        "Storage must be a whole number of TiB",
                    )),
                    Some(gb) => check_range(
                        &mut errors,
                        "storageGb",
                        Some(gb),
                        1024,
                        192 * 1024,
                        "Storage",
                        "GB",
                    ),
                }
                match fields.throughput_mbs {
                    None => errors.push(FieldError::new("throughputMbs", "Throughput is required")),
                    Some(mbs) if !ONTAP_THROUGHPUT_STEPS.contains(&mbs) => {
                        errors.push(FieldError::new(
                            "throughputMbs",
                            "Throughput must be a power of two between 128 and 2048 MB/s",
                        ))
                    }
                    Some(_) => {}
                }
                check_range(&mut errors, "volumeSize", fields.volume_size, 1, 100, "Volume", "GiB");
                check_backups(&mut errors, fields);
                if *self == Self::FsxOntapWindows {
                    check_drive(&mut errors, fields);
                }
            }
        }
        errors
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn check_range(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<i64>,
    min: i64,
    max: i64,
    label: &str,
    unit: &str,
) {
    match value {
        None => errors.push(FieldError::new(field, format!("{label} is required"))),
        Some(v) if v < min => {
            errors.push(FieldError::new(field, format!("{label} minimum is {min} {unit}")))
        }
        Some(v) if v > max => {
            errors.push(FieldError::new(field, format!("{label} maximum is {max} {unit}")))
        }
        Some(_) => {}
    }
}

fn check_backups(errors: &mut Vec<FieldError>, fields: &FilesystemFields) {
    match fields.backup_retention_days {
        None => errors.push(FieldError::new(
            "backupRetentionDays",
            "Backup retention is required",
        )),
        Some(days) if days < 7 => errors.push(FieldError::new(
            "backupRetentionDays",
            "Minimum retention time is 7 days",
        )),
        Some(days) if days > 35 => errors.push(FieldError::new(
            "backupRetentionDays",
            "Maximum retention time is 35 days",
        )),
        Some(_) => {}
    }
    match fields.daily_backup_time.as_deref() {
        None | Some("") => errors.push(FieldError::new(
            "dailyBackupTime",
            "Daily backup time is required",
        )),
        Some(time) if !is_clock_time(time) => errors.push(FieldError::new(
            "dailyBackupTime",
            "Daily backup time must be HH:MM",
        )),
        Some(_) => {}
    }
    match fields.weekly_maintenance_day.as_deref() {
        Some(day) if is_weekday(day) => {}
        _ => errors.push(FieldError::new(
            "weeklyMaintenanceDay",
            "Weekly maintenance day must be between 1 (Sunday) and 7 (Saturday)",
        )),
    }
    match fields.weekly_maintenance_time.as_deref() {
        None | Some("") => errors.push(FieldError::new(
            "weeklyMaintenanceTime",
            "Weekly maintenance time is required",
        )),
        Some(time) if !is_clock_time(time) => errors.push(FieldError::new(
            "weeklyMaintenanceTime",
            "Weekly maintenance time must be HH:MM",
        )),
        Some(_) => {}
    }
}

fn check_drive(errors: &mut Vec<FieldError>, fields: &FilesystemFields) {
    static DRIVE: OnceLock<Regex> = OnceLock::new();
    let drive = DRIVE.get_or_init(|| Regex::new(r"^[A-Z]:$").unwrap());
    match fields.windows_mount_drive.as_deref() {
        None | Some("") => errors.push(FieldError::new(
            "windowsMountDrive",
            "Windows mount drive is required",
        )),
        Some(letter) if !drive.is_match(letter) => errors.push(FieldError::new(
            "windowsMountDrive",
            "Windows mount drive must be a drive letter such as G:",
        )),
        Some(_) => {}
    }
}

fn validate_linux_mount_point(mount_point: &str) -> Option<String> {
    static LINUX_PATH: OnceLock<Regex> = OnceLock::new();
    let linux_path = LINUX_PATH.get_or_init(|| Regex::new(r"^(/[a-zA-Z._-]+)*$").unwrap());
    if !linux_path.is_match(mount_point) {
        return Some("Invalid path. Ex: /mnt".to_string());
    }
    if mount_point.len() > 100 {
        return Some("The full path can't exceed 100 characters in length".to_string());
    }
    if mount_point.matches('/').count() > EFS_MAX_SUBDIRECTORIES {
        return Some("The path can only include up to four subdirectories".to_string());
    }
    None
}

/// `C:\` followed by backslash separated segments free of reserved
/// characters. A separator may not follow a space or a dot.
pub fn is_windows_path(path: &str) -> bool {
    static DRIVE_ROOT: OnceLock<Regex> = OnceLock::new();
    let drive_root = DRIVE_ROOT.get_or_init(|| Regex::new(r"^[a-zA-Z]:\\").unwrap());
    if !drive_root.is_match(path) {
        return false;
    }
    let rest = &path[3..];
    if rest.chars().any(|c| matches!(c, '<' | '>' | ':' | '"' | '/' | '|' | '?' | '*')) {
        return false;
    }
    let segments: Vec<&str> = rest.split('\\').collect();
    let last = segments.len() - 1;
    segments.iter().enumerate().all(|(index, segment)| {
        if index == last {
            return true;
        }
        !segment.is_empty() && !segment.ends_with(' ') && !segment.ends_with('.')
    })
}

fn is_clock_time(value: &str) -> bool {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    let clock =
        CLOCK.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d(:[0-5]\d)?$").unwrap());
    clock.is_match(value)
}

fn is_weekday(value: &str) -> bool {
    matches!(value, "1" | "2" | "3" | "4" | "5" | "6" | "7")
}
