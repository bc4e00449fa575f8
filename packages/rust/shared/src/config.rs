//! Application configuration for poolset.
//!
//! User config lives at `~/.poolset/poolset.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PoolsetError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "poolset.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".poolset";

// ---------------------------------------------------------------------------
// Config structs (matching poolset.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Primary registry source.
    #[serde(default)]
    pub primary: PrimarySourceConfig,

    /// Classification source.
    #[serde(default)]
    pub classification: ClassificationSourceConfig,

    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Extra manual corrections, added to the built-in tables.
    #[serde(default)]
    pub manual_fixes: ManualFixesConfig,
}

/// `[primary]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimarySourceConfig {
    /// Paginated pool list endpoint.
    #[serde(default = "default_primary_url")]
    pub url: String,

    /// Records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Fields requested from the registry.
    #[serde(default = "default_select")]
    pub select: Vec<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PrimarySourceConfig {
    fn default() -> Self {
        Self {
            url: default_primary_url(),
            page_size: default_page_size(),
            select: default_select(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_primary_url() -> String {
    "https://api.koios.rest/api/v1/pool_list".into()
}
fn default_page_size() -> u32 {
    1000
}
fn default_select() -> Vec<String> {
    ["pool_id_bech32", "ticker", "pledge", "active_stake", "pool_status"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Which key a classification source joins on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMode {
    /// Keyed by pool id/hash; labels are mapped to sSPO/MPO.
    #[default]
    Hash,
    /// Keyed by ticker; labels are assigned as-is.
    Ticker,
    /// No classification source; every pool is sSPO.
    None,
}

impl std::fmt::Display for ClassificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Hash => "hash",
            Self::Ticker => "ticker",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// `[classification]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSourceConfig {
    /// Join strategy.
    #[serde(default)]
    pub mode: ClassificationMode,

    /// Single-shot endpoint returning classification entries.
    #[serde(default = "default_classification_url")]
    pub url: String,

    /// Key under which the entry list may be nested.
    #[serde(default = "default_wrapper_key", skip_serializing_if = "Option::is_none")]
    pub wrapper_key: Option<String>,

    /// Entry field holding the join key.
    #[serde(default = "default_key_field")]
    pub key_field: String,

    /// Entry field holding the class label.
    #[serde(default = "default_label_field")]
    pub label_field: String,

    /// Entry field holding a display ticker.
    #[serde(default = "default_display_field", skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassificationSourceConfig {
    fn default() -> Self {
        Self {
            mode: ClassificationMode::default(),
            url: default_classification_url(),
            wrapper_key: default_wrapper_key(),
            key_field: default_key_field(),
            label_field: default_label_field(),
            display_field: default_display_field(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_classification_url() -> String {
    "https://www.balanceanalytics.io/api/groupdata.json".into()
}
fn default_wrapper_key() -> Option<String> {
    Some("pool_group_json".into())
}
fn default_key_field() -> String {
    "pool_hash".into()
}
fn default_label_field() -> String {
    "pool_group".into()
}
fn default_display_field() -> Option<String> {
    Some("pool_ticker".into())
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the exports.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// File name of the full dataset export.
    #[serde(default = "default_pools_file")]
    pub pools_file: String,

    /// Path of the authoritative override dataset.
    #[serde(default = "default_overrides_file")]
    pub overrides_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            pools_file: default_pools_file(),
            overrides_file: default_overrides_file(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_pools_file() -> String {
    "pools.json".into()
}
fn default_overrides_file() -> String {
    "overrides.json".into()
}

/// `[manual_fixes]` section: entries here extend the built-in tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualFixesConfig {
    /// Pool id → ticker, applied when the pool has no ticker.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tickers: BTreeMap<String, String>,

    /// Tickers always classified as MPO.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mpo_tickers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Primary registry source.
    pub primary: PrimarySourceConfig,
    /// Read primary records from this JSON snapshot instead of the registry.
    pub input: Option<PathBuf>,
    /// Classification source.
    pub classification: ClassificationSourceConfig,
    /// Directory receiving the exports.
    pub output_dir: PathBuf,
    /// File name of the full dataset export.
    pub pools_file: String,
    /// Path of the authoritative override dataset.
    pub overrides_path: PathBuf,
    /// Extra manual corrections.
    pub manual_fixes: ManualFixesConfig,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            primary: config.primary.clone(),
            input: None,
            classification: config.classification.clone(),
            output_dir: PathBuf::from(&config.output.dir),
            pools_file: config.output.pools_file.clone(),
            overrides_path: PathBuf::from(&config.output.overrides_file),
            manual_fixes: config.manual_fixes.clone(),
        }
    }
}

impl PipelineConfig {
    /// Path of the full dataset export.
    pub fn pools_path(&self) -> PathBuf {
        self.output_dir.join(&self.pools_file)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.input.is_none() {
            if self.primary.page_size == 0 {
                return Err(PoolsetError::config("primary.page_size must be positive"));
            }
            if self.primary.url.trim().is_empty() {
                return Err(PoolsetError::config("primary.url must not be empty"));
            }
        }
        if self.classification.mode != ClassificationMode::None
            && self.classification.url.trim().is_empty()
        {
            return Err(PoolsetError::config(
                "classification.url must be set unless classification.mode = \"none\"",
            ));
        }
        if self.pools_file.trim().is_empty() {
            return Err(PoolsetError::config("output.pools_file must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.poolset/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PoolsetError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.poolset/poolset.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PoolsetError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PoolsetError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PoolsetError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PoolsetError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PoolsetError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("api.koios.rest"));
        assert!(toml_str.contains("pool_group_json"));
        assert!(toml_str.contains("overrides.json"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.primary.page_size, 1000);
        assert_eq!(parsed.classification.mode, ClassificationMode::Hash);
        assert_eq!(parsed.classification.key_field, "pool_hash");
    }

    #[test]
    fn ticker_mode_with_flat_source() {
        let toml_str = r#"
[classification]
mode = "ticker"
url = "https://example.com/groups.json"
key_field = "ticker"
label_field = "group"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.classification.mode, ClassificationMode::Ticker);
        assert_eq!(config.classification.label_field, "group");
        // Unset optional fields still get their defaults.
        assert_eq!(config.classification.display_field.as_deref(), Some("pool_ticker"));
    }

    #[test]
    fn manual_fixes_section() {
        let toml_str = r#"
[manual_fixes]
mpo_tickers = ["ABC"]

[manual_fixes.tickers]
pool1xyz = "XYZ"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.manual_fixes.mpo_tickers, vec!["ABC".to_string()]);
        assert_eq!(config.manual_fixes.tickers.get("pool1xyz").map(String::as_str), Some("XYZ"));
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.pools_path(), PathBuf::from("./pools.json"));
        assert_eq!(pipeline.overrides_path, PathBuf::from("overrides.json"));
        assert!(pipeline.input.is_none());
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn validation_rejects_zero_page_size() {
        let mut pipeline = PipelineConfig::from(&AppConfig::default());
        pipeline.primary.page_size = 0;
        let err = pipeline.validate().unwrap_err();
        assert!(err.to_string().contains("page_size"));

        // A snapshot input never paginates.
        pipeline.input = Some(PathBuf::from("snapshot.json"));
        assert!(pipeline.validate().is_ok());
    }
}
