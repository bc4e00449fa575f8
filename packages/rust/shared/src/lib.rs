//! Shared types, error model, and configuration for poolset.
//!
//! This crate is the foundation depended on by all other poolset crates.
//! It provides:
//! - [`PoolsetError`]: the unified error type
//! - Domain types ([`RawRecord`], [`PoolRecord`], [`Group`], [`ClassificationEntry`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClassificationMode, ClassificationSourceConfig, ManualFixesConfig, OutputConfig,
    PipelineConfig, PrimarySourceConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{PoolsetError, Result};
pub use types::{
    ClassificationEntry, GROUP_FIELD, Group, ID_FIELD, PLEDGE_FIELD, PoolRecord, RETIRED_STATUS,
    RawRecord, STAKE_ALIAS_FIELD, STAKE_FIELD, STATUS_FIELD, TICKER_FIELD, stake_of,
};
