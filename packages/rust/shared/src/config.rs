//! Application configuration for PageGrade.
//!
//! User config lives at `~/.pagegrade/pagegrade.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GradeError, Result};
use crate::types::{Category, Severity};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pagegrade.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagegrade";

// ---------------------------------------------------------------------------
// Config structs (matching pagegrade.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine limits.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Rule catalog weights and per-rule overrides.
    #[serde(default)]
    pub catalog: RuleCatalogConfig,

    /// Report export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// `[engine]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for one document's evaluation fan-out.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Documents evaluated concurrently in a batch run.
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    /// Overall score at or above which a page counts as passing.
    #[serde(default = "default_compliance_threshold")]
    pub compliance_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_concurrent_checks: default_max_concurrent_checks(),
            compliance_threshold: default_compliance_threshold(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}
fn default_max_concurrent_checks() -> usize {
    5
}
fn default_compliance_threshold() -> f64 {
    70.0
}

/// `[catalog]` section.
///
/// Weights are validated by the catalog loader, not here: a config that
/// parses can still be rejected at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCatalogConfig {
    /// Version label recorded in every report.
    #[serde(default = "default_catalog_version")]
    pub version: String,

    /// Category weights in percent, keyed by category id. Must cover all six
    /// categories and sum to 100.
    #[serde(default = "default_category_weights")]
    pub category_weights: BTreeMap<String, f64>,

    /// Per-rule overrides keyed by rule id.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleOverride>,
}

impl Default for RuleCatalogConfig {
    fn default() -> Self {
        Self {
            version: default_catalog_version(),
            category_weights: default_category_weights(),
            rules: BTreeMap::new(),
        }
    }
}

impl RuleCatalogConfig {
    /// Disable every rule except the given ones.
    pub fn only(mut self, rule_ids: &[&str], all_rule_ids: &[&str]) -> Self {
        for id in all_rule_ids {
            let entry = self.rules.entry((*id).to_string()).or_default();
            entry.enabled = Some(rule_ids.contains(id));
        }
        self
    }

    /// Override one rule's weight.
    pub fn with_rule_weight(mut self, rule_id: &str, weight: f64) -> Self {
        self.rules.entry(rule_id.to_string()).or_default().weight = Some(weight);
        self
    }
}

fn default_catalog_version() -> String {
    concat!("builtin-", env!("CARGO_PKG_VERSION")).into()
}

fn default_category_weights() -> BTreeMap<String, f64> {
    Category::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), c.default_weight_percent()))
        .collect()
}

/// `[catalog.rules.<id>]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOverride {
    /// Set to `false` to drop the rule from the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Category-relative weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory exported reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Emit one row per check (true) or one row per page (false).
    #[serde(default = "default_true")]
    pub detailed: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            detailed: true,
        }
    }
}

fn default_output_dir() -> String {
    "./reports".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagegrade/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| GradeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pagegrade/pagegrade.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| GradeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| GradeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| GradeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| GradeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| GradeError::io(&path, e))?;
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
        assert!(toml_str.contains("timeout_ms"));
        assert!(toml_str.contains("accessibility = 25.0"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.engine.max_concurrent_checks, 5);
        assert_eq!(parsed.catalog.category_weights.len(), 6);
        assert!(parsed.export.detailed);
    }

    #[test]
    fn config_with_rule_overrides() {
        let toml_str = r#"
[engine]
timeout_ms = 250

[catalog.rules.alt_text]
weight = 0.6
severity = "medium"

[catalog.rules.aria_labels]
enabled = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.engine.timeout_ms, 250);
        assert_eq!(config.catalog.category_weights.len(), 6);

        let alt = &config.catalog.rules["alt_text"];
        assert_eq!(alt.weight, Some(0.6));
        assert_eq!(alt.severity, Some(Severity::Medium));
        assert_eq!(config.catalog.rules["aria_labels"].enabled, Some(false));
    }

    #[test]
    fn partial_weight_table_replaces_defaults() {
        let toml_str = r#"
[catalog.category_weights]
accessibility = 50.0
seo = 50.0
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        // Missing categories are not filled in; the catalog loader rejects this.
        assert_eq!(config.catalog.category_weights.len(), 2);
    }

    #[test]
    fn only_disables_everything_else() {
        let config = RuleCatalogConfig::default().only(&["a"], &["a", "b"]);
        assert_eq!(config.rules["a"].enabled, Some(true));
        assert_eq!(config.rules["b"].enabled, Some(false));
    }
}
