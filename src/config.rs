use anyhow::{Context, Error};
use config::Config;

#[derive(Debug, Clone, Copy, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Validate the stored configuration and report problems.
    Check,
    /// Rewrite the stored configuration in canonical wire form.
    Normalize,
}

#[derive(Debug, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    pub settings_file: String,
    pub tiers_file: String,
    pub options_file: String,
    pub action: Action,
    pub write_back: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settings_file: "./appconfig.json".to_string(),
            tiers_file: "./tiers.json".to_string(),
            options_file: String::new(),
            action: Action::Check,
            write_back: false,
        }
    }
}

pub fn load_settings() -> Result<EngineSettings, Error> {
    let config = Config::builder()
        .add_source(config::Environment::with_prefix("tierconf"))
        .build()
        .context("Can't load configuration")?;

    config
        .try_deserialize()
        .context("Can't deserialize EngineSettings from loaded configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_gives_defaults() {
        let settings: EngineSettings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn overrides_are_applied_over_defaults() {
        let settings: EngineSettings = Config::builder()
            .set_override("action", "normalize")
            .unwrap()
            .set_override("write_back", true)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.action, Action::Normalize);
        assert!(settings.write_back);
        assert_eq!(settings.tiers_file, "./tiers.json");
    }
}
