//! Application configuration for OrgScout.
//!
//! User config lives at `~/.orgscout/orgscout.toml`.
//! CLI flags override config file values, which override defaults.
//! A handful of budget ceilings can also be overridden via `ORGSCOUT_*`
//! environment variables (applied after the file is parsed).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OrgScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "orgscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".orgscout";

// ---------------------------------------------------------------------------
// Config structs (matching orgscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Budget ceilings before the mode multiplier.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Cache layer settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Discovery run settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Firmographics enrichment settings.
    #[serde(default)]
    pub enrich: EnrichConfig,

    /// Ledger store settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// `[budget]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum search queries per run.
    #[serde(default = "default_max_searches")]
    pub max_searches: u64,

    /// Maximum page fetches per run.
    #[serde(default = "default_max_fetches")]
    pub max_fetches: u64,

    /// Maximum enrichment lookups per run.
    #[serde(default = "default_max_enrich")]
    pub max_enrich: u64,

    /// Maximum LLM tokens per run. Zero disables LLM assistance.
    #[serde(default = "default_max_llm_tokens")]
    pub max_llm_tokens: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_searches: default_max_searches(),
            max_fetches: default_max_fetches(),
            max_enrich: default_max_enrich(),
            max_llm_tokens: default_max_llm_tokens(),
        }
    }
}

fn default_max_searches() -> u64 {
    120
}
fn default_max_fetches() -> u64 {
    150
}
fn default_max_enrich() -> u64 {
    80
}
fn default_max_llm_tokens() -> u64 {
    0
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disk cache directory. Relative paths resolve against the working dir.
    #[serde(default = "default_cache_dir")]
    pub dir: String,

    /// Wall-clock TTL for disk entries, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Capacity of the in-memory LRU layer.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_secs: default_cache_ttl_secs(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

fn default_cache_dir() -> String {
    "cache".into()
}
fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 3600
}
fn default_memory_capacity() -> usize {
    1000
}

/// `[transport]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per external call (first try included).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Initial retry backoff in milliseconds.
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,

    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Maximum fetches against any single domain per run.
    #[serde(default = "default_per_domain_cap")]
    pub per_domain_cap: u64,

    /// Fetch domain allowlist. Empty means any domain.
    #[serde(default)]
    pub allowlist: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_max_ms: default_retry_max_ms(),
            per_domain_cap: default_per_domain_cap(),
            allowlist: Vec::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_initial_ms() -> u64 {
    1000
}
fn default_retry_max_ms() -> u64 {
    8000
}
fn default_per_domain_cap() -> u64 {
    25
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Share of the target allocated to NA when region = both.
    #[serde(default = "default_region_ratio")]
    pub region_ratio: f64,

    /// Checkpoint every N processed enrichment chunks.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,

    /// Stage error rate that short-circuits the run to output.
    #[serde(default = "default_error_tolerance")]
    pub error_tolerance: f64,

    /// Root directory for run artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory for checkpoint records.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,

    /// Concurrent fetch/enrich operations inside a stage.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            region_ratio: default_region_ratio(),
            checkpoint_interval: default_checkpoint_interval(),
            error_tolerance: default_error_tolerance(),
            output_dir: default_output_dir(),
            checkpoint_dir: default_checkpoint_dir(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_region_ratio() -> f64 {
    0.8
}
fn default_checkpoint_interval() -> u32 {
    10
}
fn default_error_tolerance() -> f64 {
    0.5
}
fn default_output_dir() -> String {
    "runs".into()
}
fn default_checkpoint_dir() -> String {
    "checkpoints".into()
}
fn default_concurrency() -> u32 {
    4
}

/// `[enrich]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Base URL of the firmographics API. Empty disables enrichment;
    /// the enrich stage then records gaps instead of calling out.
    #[serde(default)]
    pub api_base: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_enrich_key_env")]
    pub api_key_env: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key_env: default_enrich_key_env(),
        }
    }
}

fn default_enrich_key_env() -> String {
    "ORGSCOUT_ENRICH_KEY".into()
}

/// `[ledger]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory holding the per-segment ledger JSON files.
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> String {
    "ledger".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.orgscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OrgScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.orgscout/orgscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does
/// not exist. Environment overrides are applied either way.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OrgScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OrgScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `ORGSCOUT_*` environment overrides to budget ceilings.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(v) = env_u64("ORGSCOUT_MAX_SEARCHES") {
        config.budget.max_searches = v;
    }
    if let Some(v) = env_u64("ORGSCOUT_MAX_FETCHES") {
        config.budget.max_fetches = v;
    }
    if let Some(v) = env_u64("ORGSCOUT_MAX_ENRICH") {
        config.budget.max_enrich = v;
    }
    if let Some(v) = env_u64("ORGSCOUT_MAX_LLM_TOKENS") {
        config.budget.max_llm_tokens = v;
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OrgScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OrgScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OrgScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the enrichment API key env var is set and non-empty.
/// Only required when an `api_base` is configured.
pub fn validate_enrich_key(config: &AppConfig) -> Result<()> {
    if config.enrich.api_base.is_empty() {
        return Ok(());
    }
    let var_name = &config.enrich.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(OrgScoutError::config(format!(
            "enrichment API key not found. Set the {var_name} environment variable \
             or clear [enrich].api_base to run without enrichment."
        ))),
    }
}
