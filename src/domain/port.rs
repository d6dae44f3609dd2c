use anyhow::Error;
use async_trait::async_trait;

use super::{model::Tier, wire::PersistableConfig};

/// Settings persistence collaborator. Transport, authentication and
/// serialization live behind this boundary.
#[async_trait]
pub trait SettingsStore {
    async fn fetch_config(&self) -> Result<PersistableConfig, Error>;

    async fn update_config(&self, config: &PersistableConfig) -> Result<(), Error>;

    async fn fetch_tiers(&self) -> Result<Vec<Tier>, Error>;
}
