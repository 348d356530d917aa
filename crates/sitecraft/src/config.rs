//! Project configuration file support for sitecraft.
//!
//! Loads configuration from `sitecraft.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Project-level configuration loaded from `sitecraft.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default provider (applies to both judge and refiner)
    pub provider: Option<String>,
    /// Global default model (applies to both judge and refiner)
    pub model: Option<String>,
    /// Judge-specific configuration
    #[serde(default)]
    pub judge: RoleConfig,
    /// Refiner-specific configuration
    #[serde(default)]
    pub refiner: RoleConfig,
    #[serde(default)]
    pub refinement: RefinementSection,
    #[serde(default)]
    pub subject: SubjectSection,
}

/// Configuration for a specific role (judge or refiner)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RefinementSection {
    pub threshold: Option<f64>,
    pub max_iterations: Option<usize>,
}

/// What the page is about
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SubjectSection {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Inline style system / design tokens
    pub style: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "sitecraft.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Get the effective provider for the judge role.
    /// Priority: [judge].provider > global provider > None
    pub fn judge_provider(&self) -> Option<&str> {
        self.judge.provider.as_deref().or(self.provider.as_deref())
    }

    /// Priority: [judge].model > global model > None
    pub fn judge_model(&self) -> Option<&str> {
        self.judge.model.as_deref().or(self.model.as_deref())
    }

    /// Priority: [refiner].provider > global provider > None
    pub fn refiner_provider(&self) -> Option<&str> {
        self.refiner.provider.as_deref().or(self.provider.as_deref())
    }

    /// Priority: [refiner].model > global model > None
    pub fn refiner_model(&self) -> Option<&str> {
        self.refiner.model.as_deref().or(self.model.as_deref())
    }
}
