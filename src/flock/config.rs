use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::FlockError;
use crate::workflow::WorkflowConfig;

/// Flock configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub name: String,
    /// Model name given to agents that do not set their own
    pub model: Option<String>,
    /// Run agents as activities under `temporal_config`
    pub enable_temporal: bool,
    pub temporal_config: WorkflowConfig,
    /// Upper bound on agent steps in one run
    pub max_agent_iterations: usize,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            name: "flock".into(),
            model: None,
            enable_temporal: false,
            temporal_config: WorkflowConfig::default(),
            max_agent_iterations: 20,
        }
    }
}

impl FlockConfig {
    /// `~/.config/flock/config.json` or the platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flock").join("config.json"))
    }

    /// Load from a JSON config file
    ///
    /// Reads the `flock` section when present, otherwise the whole document.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let section = config.get("flock").cloned().unwrap_or(config);
        let loaded: Self =
            serde_json::from_value(section).context("Failed to parse flock config")?;
        loaded
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(loaded)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.name.trim().is_empty() {
            return Err(FlockError::Config("name must not be empty".into()));
        }
        if self.max_agent_iterations == 0 {
            return Err(FlockError::Config(
                "max_agent_iterations must be at least 1".into(),
            ));
        }
        self.temporal_config.validate()
    }
}
