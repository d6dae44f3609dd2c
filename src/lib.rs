//! Tiered application configuration engine: filesystem variant registry,
//! default-tier resolution, validation and wire conversion, plus the edit
//! session that drives them against a settings store.

pub mod config;
pub mod domain;
pub mod infra;

pub use domain::{
    error::EngineError,
    model::{ApplicationConfig, Tier, TierOverride},
    resolve::{resolve_tier, DefaultTier},
    transform::{to_editable, to_wire},
    validation::{build_schema, ValidationReport, ValidationSchema},
    wire::PersistableConfig,
    EditSession,
};
