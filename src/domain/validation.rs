use std::{collections::HashSet, fmt, sync::OnceLock};

use itertools::Itertools;
use regex::Regex;
use serde::Serialize;

use super::{
    filesystem::available_types,
    model::{ApplicationConfig, OperatingSystem, PasswordEdit, ServiceConfig, Tier, TierOverride},
    options::DbCatalog,
    resolve::{resolved_tiers, DefaultTier},
};

pub const MAX_INSTANCE_COUNT: i64 = 10;

/// Location of a violation inside the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPath {
    pub service_index: Option<usize>,
    pub service_name: Option<String>,
    pub tier: Option<String>,
    pub field: String,
}

impl FieldPath {
    fn application(field: &str) -> Self {
        FieldPath {
            service_index: None,
            service_name: None,
            tier: None,
            field: field.to_string(),
        }
    }

    fn service(index: usize, service: &ServiceConfig, field: &str) -> Self {
        FieldPath {
            service_index: Some(index),
            service_name: Some(service.name.clone()),
            tier: None,
            field: field.to_string(),
        }
    }

    fn tier(index: usize, service: &ServiceConfig, tier: &str, field: &str) -> Self {
        FieldPath {
            tier: Some(tier.to_string()),
            ..Self::service(index, service, field)
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(index) = self.service_index {
            write!(f, "services[{index}].")?;
        }
        if let Some(tier) = &self.tier {
            write!(f, "tiers.{tier}.")?;
        }
        f.write_str(&self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: FieldPath,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// First violation recorded for a rendered path such as `services[0].tiers.gold.max`.
    pub fn error_at(&self, path: &str) -> Option<&str> {
        self.violations
            .iter()
            .find(|violation| violation.path.to_string() == path)
            .map(|violation| violation.message.as_str())
    }

    pub fn has_error_at(&self, path: &str) -> bool {
        self.error_at(path).is_some()
    }

    /// Aggregate banner text, e.g. `Errors in form: Service api Tiers gold; silver`.
    pub fn summary(&self) -> Option<String> {
        if self.is_valid() {
            return None;
        }
        let services = self
            .violations
            .iter()
            .filter_map(|violation| {
                violation
                    .path
                    .service_index
                    .map(|index| (index, &violation.path))
            })
            .sorted_by_key(|(index, _)| *index)
            .chunk_by(|(index, _)| *index);
        let parts: Vec<String> = services
            .into_iter()
            .map(|(index, paths)| {
                let paths: Vec<&FieldPath> = paths.map(|(_, path)| path).collect();
                let name = paths
                    .first()
                    .and_then(|path| path.service_name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("#{}", index + 1));
                let tiers = paths.iter().filter_map(|path| path.tier.as_deref()).unique().join("; ");
                if tiers.is_empty() {
                    format!("Service {name}")
                } else {
                    format!("Service {name} Tiers {tiers}")
                }
            })
            .collect();
        if parts.is_empty() {
            Some("Errors in form: Application".to_string())
        } else {
            Some(format!("Errors in form: {}", parts.join(", ")))
        }
    }

    fn push(&mut self, path: FieldPath, message: impl Into<String>) {
        self.violations.push(Violation {
            path,
            message: message.into(),
        });
    }
}

/// Rules for a whole application configuration over a fixed tier list.
///
/// Conditions that depend on sibling values (OS, launch type, provisioning
/// flags, tombstones) are evaluated against the data at validation time.
#[derive(Debug, Clone)]
pub struct ValidationSchema {
    tiers: Vec<Tier>,
    default_tier: DefaultTier,
    catalog: DbCatalog,
}

pub fn build_schema(tiers: &[Tier], default_tier: &DefaultTier) -> ValidationSchema {
    ValidationSchema {
        tiers: tiers.to_vec(),
        default_tier: default_tier.clone(),
        catalog: DbCatalog::default(),
    }
}

impl ValidationSchema {
    /// Also check database instance classes against the offered catalog.
    pub fn with_catalog(mut self, catalog: DbCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn validate(&self, config: &ApplicationConfig) -> ValidationReport {
        let mut report = ValidationReport::default();

        if config.name.trim().is_empty() {
            report.push(FieldPath::application("name"), "Name is a required field.");
        }
        if config.live_services().next().is_none() {
            report.push(
                FieldPath::application("services"),
                "At least one service is required",
            );
        }
        if config.provision_billing && config.billing.plan_id.trim().is_empty() {
            report.push(
                FieldPath::application("billing.planId"),
                "Billing plan is a required field",
            );
        }

        let mut seen_names = HashSet::new();
        for (index, service) in config.services.iter().enumerate() {
            if service.tombstone {
                continue;
            }
            if !service.name.is_empty() && !seen_names.insert(service.name.as_str()) {
                report.push(
                    FieldPath::service(index, service, "name"),
                    "Service name must be unique",
                );
            }
            self.validate_service(index, service, &mut report);
        }
        report
    }

    fn validate_service(&self, index: usize, service: &ServiceConfig, report: &mut ValidationReport) {
        let path = |field: &str| FieldPath::service(index, service, field);

        if service.name.trim().is_empty() {
            report.push(path("name"), "Service name is a required field");
        }
        if service.public && service.path.trim().is_empty() {
            report.push(path("path"), "Path is required for publicly accessible services");
        }
        if service.health_check_url.is_empty() {
            report.push(path("healthCheckUrl"), "Health Check URL is a required field");
        } else if !service.health_check_url.starts_with('/') {
            report.push(
                path("healthCheckUrl"),
                "Health Check must start with forward slash (/)",
            );
        }
        match service.container_port {
            None => report.push(path("containerPort"), "Container port is a required field."),
            Some(port) if !(1..=65535).contains(&port) => {
                report.push(path("containerPort"), "Container port must be between 1 and 65535")
            }
            Some(_) => {}
        }
        match service.operating_system {
            None => report.push(path("operatingSystem"), "Container OS is a required field"),
            Some(OperatingSystem::Windows) if service.windows_version.is_none() => {
                report.push(path("windowsVersion"), "Windows version is a required field")
            }
            Some(_) => {}
        }

        if service.provision_fs {
            self.validate_filesystem_selection(index, service, report);
        }
        if service.provision_db {
            validate_database(index, service, report);
        }

        let resolved = resolved_tiers(service, &self.tiers, &self.default_tier);
        for tier in self.editable_tiers(service) {
            if let Some(view) = resolved.get(tier) {
                self.validate_tier(index, service, tier, view, report);
            }
        }
    }

    /// Non-default tiers mirror the default tier unless the service view defaults.
    fn editable_tiers<'a>(&'a self, service: &'a ServiceConfig) -> impl Iterator<Item = &'a str> {
        self.tiers
            .iter()
            .map(|tier| tier.name.as_str())
            .filter(move |name| service.override_defaults || *name == self.default_tier.name())
    }

    fn validate_filesystem_selection(
        &self,
        index: usize,
        service: &ServiceConfig,
        report: &mut ValidationReport,
    ) {
        let path = |field: &str| FieldPath::service(index, service, field);
        let Some(fs) = service.filesystem_type else {
            report.push(path("filesystemType"), "Filesystem type is a required field");
            return;
        };
        if let Some(os) = service.operating_system {
            if !available_types(os).contains(&fs) {
                report.push(
                    path("filesystemType"),
                    format!("{} is not available for {:?} containers", fs.display_name(), os),
                );
            } else if !fs.enabled(os, service.ecs_launch_type) {
                report.push(
                    path("filesystemType"),
                    format!("{} requires the EC2 launch type", fs.display_name()),
                );
            }
        }
        if let Some(message) = fs.validate_mount_point(&service.mount_point) {
            report.push(path("mountPoint"), message);
        }
    }

    fn validate_tier(
        &self,
        index: usize,
        service: &ServiceConfig,
        tier: &str,
        view: &TierOverride,
        report: &mut ValidationReport,
    ) {
        let path = |field: &str| FieldPath::tier(index, service, tier, field);

        match view.min {
            None => report.push(path("min"), "Minimum count is a required field."),
            Some(min) if min < 1 => report.push(path("min"), "Minimum count must be at least 1"),
            Some(_) => {}
        }
        match view.max {
            None => report.push(path("max"), "Maximum count is a required field."),
            Some(max) if max > MAX_INSTANCE_COUNT => report.push(
                path("max"),
                format!("Maximum count can be no larger than {MAX_INSTANCE_COUNT}"),
            ),
            Some(max) if view.min.is_some_and(|min| max < min) => report.push(
                path("max"),
                "Maximum count cannot be smaller than minimum count",
            ),
            Some(_) => {}
        }
        if view.compute_size.as_deref().unwrap_or_default().is_empty() {
            report.push(path("computeSize"), "Compute size is a required field.");
        }

        if service.provision_fs {
            if let (Some(tier_fs), Some(service_fs)) =
                (view.filesystem_type, service.filesystem_type)
            {
                if tier_fs != service_fs {
                    report.push(
                        path("filesystemType"),
                        "Filesystem type must match the service selection",
                    );
                }
            }
            if let Some(fs) = view.filesystem_type.or(service.filesystem_type) {
                for error in fs.validate_tier(&view.filesystem) {
                    report.push(path(&format!("filesystem.{}", error.field)), error.message);
                }
            }
        }

        if service.provision_db {
            match view.database.instance.as_deref() {
                None | Some("") => report.push(path("database.instance"), "Instance is required"),
                Some(instance) => {
                    let db = &service.database;
                    let known_version = self.catalog.version(&db.engine, &db.version).is_some();
                    if known_version && !self.catalog.offers_instance(&db.engine, &db.version, instance) {
                        report.push(
                            path("database.instance"),
                            format!("Instance {instance} is not offered for version {}", db.version),
                        );
                    }
                }
            }
        }
    }
}

fn validate_database(index: usize, service: &ServiceConfig, report: &mut ValidationReport) {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    static PASSWORD: OnceLock<Regex> = OnceLock::new();
    let username = USERNAME.get_or_init(|| Regex::new(r"^[a-zA-Z]+[a-zA-Z0-9_$]*$").unwrap());
    let password = PASSWORD.get_or_init(|| Regex::new(r#"^[a-zA-Z0-9/@"' ]{8,}$"#).unwrap());

    let path = |field: &str| FieldPath::service(index, service, field);
    let db = &service.database;
    if db.engine.is_empty() {
        report.push(path("database.engine"), "Engine is required");
    }
    if db.version.is_empty() {
        report.push(path("database.version"), "Version is required");
    }
    if db.username.is_empty() {
        report.push(path("database.username"), "Username is required");
    } else if !username.is_match(&db.username) {
        report.push(path("database.username"), "Username is not valid");
    }
    match &db.password {
        PasswordEdit::Unchanged if db.encrypted_password.is_none() => {
            report.push(path("database.password"), "Password is required")
        }
        PasswordEdit::Unchanged => {}
        PasswordEdit::Cleared => report.push(path("database.password"), "Password is required"),
        PasswordEdit::Plaintext(value) if !password.is_match(value) => {
            report.push(path("database.password"), "Password is not valid")
        }
        PasswordEdit::Plaintext(_) => {}
    }
}
