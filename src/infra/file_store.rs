use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use async_trait::async_trait;
use log::{debug, info};
use serde::de::DeserializeOwned;

use crate::{
    config::EngineSettings,
    domain::{model::Tier, options::DbCatalog, port::SettingsStore, wire::PersistableConfig},
};

/// Settings store over two JSON files: the persisted application
/// configuration and the tier list.
pub struct FileSettingsStore {
    pub settings_file: PathBuf,
    pub tiers_file: PathBuf,
}

impl FileSettingsStore {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            settings_file: PathBuf::from(&settings.settings_file),
            tiers_file: PathBuf::from(&settings.tiers_file),
        }
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn fetch_config(&self) -> Result<PersistableConfig, Error> {
        read_json(&self.settings_file).await
    }

    async fn update_config(&self, config: &PersistableConfig) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(config)
            .context("Can't serialize application configuration")?;
        tokio::fs::write(&self.settings_file, content)
            .await
            .with_context(|| format!("Can't write {}", self.settings_file.display()))?;
        info!("Application configuration written to {}", self.settings_file.display());
        Ok(())
    }

    async fn fetch_tiers(&self) -> Result<Vec<Tier>, Error> {
        read_json(&self.tiers_file).await
    }
}

/// Database options file. An empty path means no catalog.
pub async fn load_catalog(path: &str) -> Result<DbCatalog, Error> {
    if path.is_empty() {
        return Ok(DbCatalog::default());
    }
    read_json(Path::new(path)).await
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    debug!("Reading {}", path.display());
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Can't read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Can't parse {}", path.display()))
}
