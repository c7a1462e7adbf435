//! Shared types, error model, and configuration for OrgScout.
//!
//! This crate is the foundation depended on by all other OrgScout crates.
//! It provides:
//! - [`OrgScoutError`], the unified error type
//! - Domain types ([`RunId`], [`Segment`], [`Mode`], [`Region`], [`LedgerEntry`])
//! - Configuration ([`AppConfig`], config loading, env overrides)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BudgetConfig, CacheConfig, DiscoveryConfig, EnrichConfig, LedgerConfig,
    TransportConfig, apply_env_overrides, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_enrich_key,
};
pub use error::{OrgScoutError, Result};
pub use types::{Firmographics, LedgerEntry, Mode, Region, RunId, Segment, StageError};
