use thiserror::Error;

use super::model::{LaunchType, OperatingSystem, ServiceId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No tier is flagged as the default tier")]
    MissingDefaultTier,

    #[error("Tiers {0:?} are all flagged as the default tier")]
    MultipleDefaultTiers(Vec<String>),

    #[error("No filesystem type is available for {os:?} with launch type {launch_type:?}")]
    NoFilesystemType {
        os: OperatingSystem,
        launch_type: Option<LaunchType>,
    },

    #[error("Filesystem type {0} is not enabled for this service")]
    FilesystemTypeDisabled(String),

    #[error("Unknown service {0}")]
    UnknownService(ServiceId),

    #[error("Field {0} must be set before submission")]
    IncompleteField(String),

    #[error("Configuration has validation errors: {0}")]
    Invalid(String),

    #[error("Settings persistence failed: {0}")]
    Persistence(#[from] anyhow::Error),
}
