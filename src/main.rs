use std::{error::Error, process::ExitCode};

use anyhow::Context;
use log::{error, info};
use tierconf::{
    config::{load_settings, Action},
    domain::EditSession,
    infra::file_store::{load_catalog, FileSettingsStore},
};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    info!("Loaded settings {:?}", settings);

    let catalog = load_catalog(&settings.options_file)
        .await
        .context("Can't load database options")?;
    let store = FileSettingsStore::from_settings(&settings);
    let mut session = EditSession::load(Box::new(store), catalog)
        .await
        .context("Can't load application configuration")?;

    let report = session.validate();
    for violation in report.violations() {
        error!("{}", violation);
    }
    if let Some(summary) = report.summary() {
        error!("{}", summary);
        return Ok(ExitCode::FAILURE);
    }

    match settings.action {
        Action::Check => info!("Application {} is valid", session.config().name),
        Action::Normalize if settings.write_back => {
            session.submit().await?;
        }
        Action::Normalize => {
            let wire = session.normalized()?;
            println!("{}", serde_json::to_string_pretty(&wire)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
