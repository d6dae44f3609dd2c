use log::{error, info, warn};

use error::EngineError;
use filesystem::{available_types, selection_for, FilesystemSelection, FilesystemType};
use model::{
    ApplicationConfig, FilesystemFields, LaunchType, OperatingSystem, PasswordEdit, ServiceConfig,
    ServiceId, Tier, TierOverride,
};
use options::DbCatalog;
use port::SettingsStore;
use resolve::{resolved_tiers, DefaultTier};
use transform::{to_editable, to_wire};
use validation::{build_schema, ValidationReport};
use wire::PersistableConfig;

pub mod error;
pub mod filesystem;
pub mod model;
pub mod options;
pub mod port;
pub mod resolve;
pub mod transform;
pub mod validation;
pub mod wire;

/// Edit-surface state for one application configuration.
///
/// Loaded once from the store, mutated in memory, then either dropped or
/// submitted. A failed submission leaves the edited state untouched.
pub struct EditSession {
    pub store: Box<dyn SettingsStore + 'static + Sync + Send>,
    tiers: Vec<Tier>,
    default_tier: DefaultTier,
    catalog: DbCatalog,
    config: ApplicationConfig,
    error: Option<String>,
    message: Option<String>,
}

impl EditSession {
    pub async fn load(
        store: Box<dyn SettingsStore + 'static + Sync + Send>,
        catalog: DbCatalog,
    ) -> Result<EditSession, EngineError> {
        let (wire, tiers) = futures::try_join!(store.fetch_config(), store.fetch_tiers())?;
        let default_tier = DefaultTier::from_tiers(&tiers)?;
        let config = to_editable(&wire, &tiers, &default_tier)?;
        info!(
            "Loaded application {} with {} services over {} tiers (default tier {})",
            config.name,
            config.services.len(),
            tiers.len(),
            default_tier.name()
        );
        Ok(EditSession {
            store,
            tiers,
            default_tier,
            catalog,
            config,
            error: None,
            message: None,
        })
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Banner text of the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn dismiss_message(&mut self) {
        self.message = None;
    }

    pub fn live_services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.config.live_services()
    }

    /// Appends a service with empty tier overrides, so every tier falls back
    /// to the default tier until edited.
    pub fn add_service(&mut self, name: &str) -> ServiceId {
        let service = ServiceConfig {
            tiers: self
                .tiers
                .iter()
                .map(|tier| (tier.name.clone(), TierOverride::default()))
                .collect(),
            ..ServiceConfig::named(name)
        };
        let id = service.id;
        info!("Service {} added as {}", name, id);
        self.config.services.push(service);
        id
    }

    /// Tombstones the service; its slot stays in place until submission.
    pub fn delete_service(&mut self, id: ServiceId) -> Result<(), EngineError> {
        let service = self.service_mut(id)?;
        service.tombstone = true;
        info!("Service {} ({}) marked as deleted", service.name, id);
        Ok(())
    }

    pub fn service_mut(&mut self, id: ServiceId) -> Result<&mut ServiceConfig, EngineError> {
        self.config
            .service_mut(id)
            .ok_or(EngineError::UnknownService(id))
    }

    fn service(&self, id: ServiceId) -> Result<&ServiceConfig, EngineError> {
        self.config.service(id).ok_or(EngineError::UnknownService(id))
    }

    /// Switches the operating system and keeps the filesystem selection
    /// consistent with it.
    pub fn set_operating_system(
        &mut self,
        id: ServiceId,
        os: OperatingSystem,
    ) -> Result<(), EngineError> {
        let service = self.service_mut(id)?;
        service.operating_system = Some(os);
        match os {
            OperatingSystem::Linux => service.windows_version = None,
            OperatingSystem::Windows => service.ecs_launch_type = Some(LaunchType::Ec2),
        }
        reconcile_filesystem_type(service)
    }

    pub fn set_launch_type(
        &mut self,
        id: ServiceId,
        launch_type: LaunchType,
    ) -> Result<(), EngineError> {
        let service = self.service_mut(id)?;
        service.ecs_launch_type = Some(launch_type);
        if service.operating_system.is_some() {
            reconcile_filesystem_type(service)?;
        }
        Ok(())
    }

    pub fn select_filesystem_type(
        &mut self,
        id: ServiceId,
        fs: FilesystemType,
    ) -> Result<(), EngineError> {
        let service = self.service_mut(id)?;
        let os = service
            .operating_system
            .ok_or_else(|| EngineError::IncompleteField(format!("{}.operatingSystem", service.name)))?;
        if !available_types(os).contains(&fs) || !fs.enabled(os, service.ecs_launch_type) {
            warn!("Filesystem type {} refused for service {}", fs, service.name);
            return Err(EngineError::FilesystemTypeDisabled(fs.to_string()));
        }
        apply_filesystem_type(service, Some(fs));
        Ok(())
    }

    /// Sets the database version and derives its family from the catalog.
    /// Tier instances the new version does not offer are cleared.
    pub fn select_database_version(
        &mut self,
        id: ServiceId,
        version: &str,
    ) -> Result<(), EngineError> {
        let catalog = self.catalog.clone();
        let service = self.service_mut(id)?;
        let db = &mut service.database;
        db.version = version.to_string();
        db.family = catalog
            .family_of(&db.engine, version)
            .unwrap_or_default()
            .to_string();
        if catalog.version(&db.engine, version).is_some() {
            let engine = db.engine.clone();
            for tier in service.tiers.values_mut() {
                let offered = tier
                    .database
                    .instance
                    .as_deref()
                    .is_some_and(|instance| catalog.offers_instance(&engine, version, instance));
                if !offered {
                    tier.database.instance = None;
                }
            }
        }
        Ok(())
    }

    pub fn set_password(&mut self, id: ServiceId, password: PasswordEdit) -> Result<(), EngineError> {
        self.service_mut(id)?.database.password = password;
        Ok(())
    }

    /// Editable override of one tier, created empty on first access.
    pub fn tier_mut(&mut self, id: ServiceId, tier: &str) -> Result<&mut TierOverride, EngineError> {
        if !self.tiers.iter().any(|known| known.name == tier) {
            return Err(EngineError::Invalid(format!("Unknown tier {tier}")));
        }
        Ok(self
            .service_mut(id)?
            .tiers
            .entry(tier.to_string())
            .or_default())
    }

    pub fn resolved_tier(&self, id: ServiceId, tier: &str) -> Result<TierOverride, EngineError> {
        let service = self.service(id)?;
        resolved_tiers(service, &self.tiers, &self.default_tier)
            .remove(tier)
            .ok_or_else(|| EngineError::Invalid(format!("Unknown tier {tier}")))
    }

    pub fn validate(&self) -> ValidationReport {
        build_schema(&self.tiers, &self.default_tier)
            .with_catalog(self.catalog.clone())
            .validate(&self.config)
    }

    /// Canonical wire form of the current state.
    pub fn normalized(&self) -> Result<PersistableConfig, EngineError> {
        to_wire(&self.config, &self.tiers, &self.default_tier)
    }

    /// Validates, converts and stores the configuration. On failure the
    /// error banner is set and the edited state is kept for a retry.
    pub async fn submit(&mut self) -> Result<(), EngineError> {
        let report = self.validate();
        if let Some(summary) = report.summary() {
            warn!("Submission refused: {}", summary);
            self.error = Some(summary.clone());
            return Err(EngineError::Invalid(summary));
        }
        let wire = match self.normalized() {
            Ok(wire) => wire,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err);
            }
        };
        if let Err(err) = self.store.update_config(&wire).await {
            error!("Failed to save application {}: {:#}", wire.name, err);
            self.error = Some(format!("{:#}", err));
            return Err(EngineError::Persistence(err));
        }
        info!(
            "Application {} saved with {} services",
            wire.name,
            wire.services.len()
        );
        self.error = None;
        self.message = Some("Application configuration saved".to_string());
        Ok(())
    }
}

fn reconcile_filesystem_type(service: &mut ServiceConfig) -> Result<(), EngineError> {
    let Some(os) = service.operating_system else {
        return Ok(());
    };
    let selected = match selection_for(os, service.ecs_launch_type) {
        Ok(FilesystemSelection::Fixed(fs)) => Some(fs),
        Ok(FilesystemSelection::Choice(types)) => service
            .filesystem_type
            .filter(|fs| types.contains(fs) && fs.enabled(os, service.ecs_launch_type)),
        Err(err) if service.provision_fs => return Err(err),
        Err(_) => None,
    };
    apply_filesystem_type(service, selected);
    Ok(())
}

/// A changed variant drops the tier filesystem settings, so the new
/// variant's defaults apply on resolution.
fn apply_filesystem_type(service: &mut ServiceConfig, fs: Option<FilesystemType>) {
    let changed = service.filesystem_type != fs;
    if changed {
        info!(
            "Service {} filesystem type {:?} -> {:?}",
            service.name, service.filesystem_type, fs
        );
    }
    service.filesystem_type = fs;
    for tier in service.tiers.values_mut() {
        tier.filesystem_type = None;
        if changed {
            tier.filesystem = FilesystemFields::default();
        }
    }
}
