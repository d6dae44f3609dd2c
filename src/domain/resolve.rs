use std::collections::BTreeMap;

use log::debug;

use super::{
    error::EngineError,
    filesystem::FilesystemType,
    model::{DatabaseTierOverride, FilesystemFields, ServiceConfig, Tier, TierOverride},
};

/// The tier every other tier falls back to, located once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultTier {
    name: String,
}

impl DefaultTier {
    pub fn from_tiers(tiers: &[Tier]) -> Result<DefaultTier, EngineError> {
        let defaults: Vec<&Tier> = tiers.iter().filter(|tier| tier.default_tier).collect();
        match defaults.as_slice() {
            [] => Err(EngineError::MissingDefaultTier),
            [tier] => Ok(DefaultTier {
                name: tier.name.clone(),
            }),
            many => Err(EngineError::MultipleDefaultTiers(
                many.iter().map(|tier| tier.name.clone()).collect(),
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Fills every field `overrides` leaves out from `default_resolved`.
///
/// `default_resolved` is itself the output of `resolve_tier(default, &TierOverride::default(), ..)`.
/// The filesystem is layered as variant defaults, then the default tier, then
/// the override, each with its maintenance window split before merging.
/// `service_filesystem_type` is the service-level selection used when neither
/// tier names a variant.
pub fn resolve_tier(
    overrides: &TierOverride,
    default_resolved: &TierOverride,
    service_filesystem_type: Option<FilesystemType>,
) -> TierOverride {
    let filesystem_type = overrides
        .filesystem_type
        .or(default_resolved.filesystem_type)
        .or(service_filesystem_type);
    let variant_defaults = filesystem_type
        .map(|fs| fs.defaults())
        .unwrap_or_default();
    let filesystem = split_maintenance_window(&overrides.filesystem)
        .over(&split_maintenance_window(&default_resolved.filesystem))
        .over(&variant_defaults);

    let resolved = TierOverride {
        compute_size: overrides
            .compute_size
            .clone()
            .or_else(|| default_resolved.compute_size.clone())
            .or_else(|| Some(String::new())),
        min: overrides.min.or(default_resolved.min).or(Some(0)),
        max: overrides.max.or(default_resolved.max).or(Some(0)),
        filesystem_type: overrides.filesystem_type.or(default_resolved.filesystem_type),
        filesystem,
        database: DatabaseTierOverride {
            instance: overrides
                .database
                .instance
                .clone()
                .or_else(|| default_resolved.database.instance.clone()),
        },
    };
    debug!(
        "Resolved tier compute={:?} min={:?} max={:?} filesystem={:?}",
        resolved.compute_size, resolved.min, resolved.max, filesystem_type
    );
    resolved
}

/// Resolved view of every tier of a service, keyed by tier name.
pub fn resolved_tiers(
    service: &ServiceConfig,
    tiers: &[Tier],
    default_tier: &DefaultTier,
) -> BTreeMap<String, TierOverride> {
    let fs = service.filesystem_type;
    let default_resolved = resolve_tier(
        &service
            .tiers
            .get(default_tier.name())
            .cloned()
            .unwrap_or_default(),
        &TierOverride::default(),
        fs,
    );
    tiers
        .iter()
        .map(|tier| {
            let resolved = if tier.name == default_tier.name() || !service.override_defaults {
                default_resolved.clone()
            } else {
                let overrides = service.tiers.get(&tier.name).cloned().unwrap_or_default();
                resolve_tier(&overrides, &default_resolved, fs)
            };
            (tier.name.clone(), resolved)
        })
        .collect()
}

/// Splits a persisted `d:HH:MM` maintenance window into day and time.
///
/// Only applies while the day is absent and the first segment is a weekday
/// digit, so a window that was already split is left alone.
pub fn split_maintenance_window(fields: &FilesystemFields) -> FilesystemFields {
    if fields.weekly_maintenance_day.is_some() {
        return fields.clone();
    }
    let Some(combined) = fields.weekly_maintenance_time.as_deref() else {
        return fields.clone();
    };
    let mut parts = combined.split(':');
    let day = parts.next().unwrap_or_default();
    let time: Vec<&str> = parts.collect();
    let is_day = day.len() == 1 && matches!(day, "1" | "2" | "3" | "4" | "5" | "6" | "7");
    if !is_day || time.len() < 2 {
        return fields.clone();
    }
    FilesystemFields {
        weekly_maintenance_day: Some(day.to_string()),
        weekly_maintenance_time: Some(time.join(":")),
        ..fields.clone()
    }
}

/// Joins day and time back into the persisted `d:HH:MM` form. Seconds are
/// dropped.
pub fn join_maintenance_window(day: &str, time: &str) -> String {
    let mut parts: Vec<&str> = time.split(':').collect();
    if parts.len() == 3 {
        parts.truncate(2);
    }
    format!("{}:{}", day, parts.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::EfsLifecycle;

    fn tier(name: &str, default_tier: bool) -> Tier {
        Tier {
            name: name.to_string(),
            default_tier,
            description: String::new(),
        }
    }

    #[test]
    fn default_tier_must_be_unique() {
        let tiers = vec![tier("free", true), tier("gold", false)];
        assert_eq!(DefaultTier::from_tiers(&tiers).unwrap().name(), "free");

        let none = vec![tier("gold", false)];
        assert!(matches!(
            DefaultTier::from_tiers(&none),
            Err(EngineError::MissingDefaultTier)
        ));

        let two = vec![tier("free", true), tier("gold", true)];
        assert!(matches!(
            DefaultTier::from_tiers(&two),
            Err(EngineError::MultipleDefaultTiers(names)) if names == vec!["free", "gold"]
        ));
    }

    #[test]
    fn empty_default_produces_base_values() {
        let resolved = resolve_tier(&TierOverride::default(), &TierOverride::default(), None);
        assert_eq!(resolved.compute_size.as_deref(), Some(""));
        assert_eq!(resolved.min, Some(0));
        assert_eq!(resolved.max, Some(0));
        assert!(resolved.filesystem.is_empty());
        assert_eq!(resolved.database.instance, None);
    }

    #[test]
    fn empty_default_uses_variant_defaults() {
        let resolved = resolve_tier(
            &TierOverride::default(),
            &TierOverride::default(),
            Some(FilesystemType::Efs),
        );
        assert_eq!(resolved.filesystem.lifecycle, Some(EfsLifecycle::Never));
        assert_eq!(resolved.filesystem.encrypt, Some(false));
    }

    #[test]
    fn override_wins_and_gaps_come_from_default() {
        let default = resolve_tier(
            &TierOverride {
                compute_size: Some("M".to_string()),
                min: Some(1),
                max: Some(3),
                ..Default::default()
            },
            &TierOverride::default(),
            None,
        );
        let gold = TierOverride {
            compute_size: Some("L".to_string()),
            ..Default::default()
        };
        let resolved = resolve_tier(&gold, &default, None);
        assert_eq!(resolved.compute_size.as_deref(), Some("L"));
        assert_eq!(resolved.min, Some(1));
        assert_eq!(resolved.max, Some(3));
    }

    #[test]
    fn nested_filesystem_fields_fall_back_individually() {
        let default = resolve_tier(
            &TierOverride {
                filesystem: FilesystemFields {
                    storage_gb: Some(64),
                    weekly_maintenance_time: Some("3:07:01".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            &TierOverride::default(),
            Some(FilesystemType::FsxWindows),
        );
        assert_eq!(default.filesystem.weekly_maintenance_day.as_deref(), Some("3"));
        assert_eq!(default.filesystem.weekly_maintenance_time.as_deref(), Some("07:01"));

        let gold = TierOverride {
            filesystem: FilesystemFields {
                throughput_mbs: Some(512),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_tier(&gold, &default, Some(FilesystemType::FsxWindows));
        assert_eq!(resolved.filesystem.storage_gb, Some(64));
        assert_eq!(resolved.filesystem.throughput_mbs, Some(512));
        assert_eq!(resolved.filesystem.weekly_maintenance_day.as_deref(), Some("3"));
        assert_eq!(resolved.filesystem.windows_mount_drive.as_deref(), Some("G:"));
    }

    #[test]
    fn override_maintenance_window_is_split() {
        let gold = TierOverride {
            filesystem: FilesystemFields {
                weekly_maintenance_time: Some("5:22:30".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let default = resolve_tier(
            &TierOverride::default(),
            &TierOverride::default(),
            Some(FilesystemType::FsxWindows),
        );
        let resolved = resolve_tier(&gold, &default, Some(FilesystemType::FsxWindows));
        assert_eq!(resolved.filesystem.weekly_maintenance_day.as_deref(), Some("5"));
        assert_eq!(resolved.filesystem.weekly_maintenance_time.as_deref(), Some("22:30"));
    }

    #[test]
    fn split_leaves_plain_times_alone() {
        let fields = FilesystemFields {
            weekly_maintenance_time: Some("07:01".to_string()),
            ..Default::default()
        };
        assert_eq!(split_maintenance_window(&fields), fields);
    }

    #[test]
    fn join_trims_seconds() {
        assert_eq!(join_maintenance_window("3", "07:01:00"), "3:07:01");
        assert_eq!(join_maintenance_window("7", "23:59"), "7:23:59");
    }

    #[test]
    fn resolution_is_idempotent() {
        let default = resolve_tier(
            &TierOverride {
                compute_size: Some("S".to_string()),
                min: Some(2),
                max: Some(4),
                ..Default::default()
            },
            &TierOverride::default(),
            Some(FilesystemType::FsxWindows),
        );
        let gold = TierOverride {
            max: Some(8),
            filesystem: FilesystemFields {
                weekly_maintenance_time: Some("2:01:30".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let once = resolve_tier(&gold, &default, Some(FilesystemType::FsxWindows));
        let twice = resolve_tier(&once, &default, Some(FilesystemType::FsxWindows));
        assert_eq!(once, twice);
    }
}
