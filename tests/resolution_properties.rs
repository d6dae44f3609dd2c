use proptest::prelude::*;
use proptest::test_runner::Config;
use tierconf::domain::{
    filesystem::FilesystemType,
    model::{
        ApplicationConfig, DatabaseTierOverride, EfsLifecycle, FilesystemFields, OperatingSystem,
        ServiceConfig, Tier, TierOverride,
    },
    resolve::{resolve_tier, DefaultTier},
    validation::build_schema,
};

fn filesystem_type() -> impl Strategy<Value = Option<FilesystemType>> {
    prop::option::of(prop::sample::select(FilesystemType::ALL.to_vec()))
}

fn maintenance_time() -> impl Strategy<Value = String> {
    prop_oneof![
        (1_u8..=7, 0_u8..24, 0_u8..60).prop_map(|(d, h, m)| format!("{d}:{h:02}:{m:02}")),
        (0_u8..24, 0_u8..60).prop_map(|(h, m)| format!("{h:02}:{m:02}")),
    ]
}

fn filesystem_fields() -> impl Strategy<Value = FilesystemFields> {
    (
        prop::option::of(prop::sample::select(vec![
            EfsLifecycle::Never,
            EfsLifecycle::After7Days,
            EfsLifecycle::After90Days,
        ])),
        prop::option::of(any::<bool>()),
        prop::option::of(32_i64..2048),
        prop::option::of(8_i64..2048),
        prop::option::of(7_i64..=35),
        prop::option::of(Just("01:00".to_string())),
        prop::option::of(maintenance_time()),
        prop::option::of("[A-Z]:"),
        prop::option::of(1_i64..=100),
    )
        .prop_map(
            |(lifecycle, encrypt, storage_gb, throughput_mbs, retention, backup, weekly, drive, volume)| {
                FilesystemFields {
                    lifecycle,
                    encrypt,
                    storage_gb,
                    throughput_mbs,
                    backup_retention_days: retention,
                    daily_backup_time: backup,
                    weekly_maintenance_day: None,
                    weekly_maintenance_time: weekly,
                    windows_mount_drive: drive,
                    volume_size: volume,
                }
            },
        )
}

fn tier_override() -> impl Strategy<Value = TierOverride> {
    (
        prop::option::of("[SMLX]{1,2}"),
        prop::option::of(0_i64..=10),
        prop::option::of(0_i64..=12),
        filesystem_type(),
        filesystem_fields(),
        prop::option::of("(T3_MICRO|M5_LARGE)"),
    )
        .prop_map(|(compute_size, min, max, filesystem_type, filesystem, instance)| TierOverride {
            compute_size,
            min,
            max,
            filesystem_type,
            filesystem,
            database: DatabaseTierOverride { instance },
        })
}

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn resolution_is_idempotent(
        overrides in tier_override(),
        default in tier_override(),
        service_fs in filesystem_type()
    ) {
        let default_resolved = resolve_tier(&default, &TierOverride::default(), service_fs);
        let once = resolve_tier(&overrides, &default_resolved, service_fs);
        let twice = resolve_tier(&once, &default_resolved, service_fs);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn absent_fields_come_from_the_default_tier(
        overrides in tier_override(),
        default in tier_override(),
        service_fs in filesystem_type()
    ) {
        let default_resolved = resolve_tier(&default, &TierOverride::default(), service_fs);
        let resolved = resolve_tier(&overrides, &default_resolved, service_fs);

        if overrides.compute_size.is_none() {
            prop_assert_eq!(&resolved.compute_size, &default_resolved.compute_size);
        }
        if overrides.min.is_none() {
            prop_assert_eq!(resolved.min, default_resolved.min);
        }
        if overrides.max.is_none() {
            prop_assert_eq!(resolved.max, default_resolved.max);
        }
        if overrides.database.instance.is_none() {
            prop_assert_eq!(&resolved.database.instance, &default_resolved.database.instance);
        }
        let (fs, base) = (&overrides.filesystem, &default_resolved.filesystem);
        if overrides.filesystem_type.is_none() {
            if fs.storage_gb.is_none() {
                prop_assert_eq!(resolved.filesystem.storage_gb, base.storage_gb);
            }
            if fs.lifecycle.is_none() {
                prop_assert_eq!(resolved.filesystem.lifecycle, base.lifecycle);
            }
            if fs.windows_mount_drive.is_none() {
                prop_assert_eq!(&resolved.filesystem.windows_mount_drive, &base.windows_mount_drive);
            }
            if fs.weekly_maintenance_time.is_none() {
                prop_assert_eq!(
                    &resolved.filesystem.weekly_maintenance_day,
                    &base.weekly_maintenance_day
                );
                prop_assert_eq!(
                    &resolved.filesystem.weekly_maintenance_time,
                    &base.weekly_maintenance_time
                );
            }
        }
    }

    #[test]
    fn max_is_bounded_by_min_and_ten(min in 1_i64..=10, max in 0_i64..=15) {
        let tiers = vec![Tier {
            name: "free".to_string(),
            default_tier: true,
            description: String::new(),
        }];
        let default_tier = DefaultTier::from_tiers(&tiers).unwrap();
        let mut service = ServiceConfig {
            path: "/".to_string(),
            operating_system: Some(OperatingSystem::Linux),
            ..ServiceConfig::named("api")
        };
        service.tiers.insert(
            "free".to_string(),
            TierOverride {
                compute_size: Some("M".to_string()),
                min: Some(min),
                max: Some(max),
                ..Default::default()
            },
        );
        let config = ApplicationConfig {
            name: "shop".to_string(),
            services: vec![service],
            ..Default::default()
        };
        let report = build_schema(&tiers, &default_tier).validate(&config);
        let rejected = report.has_error_at("services[0].tiers.free.max");
        prop_assert_eq!(rejected, max < min || max > 10);
    }
}
