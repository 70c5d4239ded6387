//! # Emitter Configuration
//!
//! Settings shared by every subcommand, loaded from an optional YAML file
//! (`--config`). Missing keys take their defaults, so an empty file is a
//! valid config.
//!
//! ```yaml
//! environment: 2          # tpAmb: 1 production, 2 homologation
//! uf: PR                  # emitter's federation unit
//! tax_id: "81452880000139"
//! schema_version: "3.00"
//! state_dir: .mdfe
//! ```
//!
//! The contingency config is the only persisted state. It lives in
//! `state_dir/contingency.json` in its compact JSON form.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mdfe_core::{Environment, DEFAULT_VERSION};
use mdfe_state::{ContingencyConfig, ContingencyHandle};
use serde::{Deserialize, Serialize};

/// File name of the persisted contingency config inside `state_dir`.
pub const CONTINGENCY_FILE: &str = "contingency.json";

/// Emitter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Authority environment.
    pub environment: Environment,
    /// Federation-unit acronym of the emitter.
    pub uf: Option<String>,
    /// Emitter CNPJ or CPF.
    pub tax_id: Option<String>,
    /// Layout version of generated payloads.
    pub schema_version: String,
    /// Directory holding persisted state.
    pub state_dir: PathBuf,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Homologation,
            uf: None,
            tax_id: None,
            schema_version: DEFAULT_VERSION.to_string(),
            state_dir: PathBuf::from(".mdfe"),
        }
    }
}

impl EmitterConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Path of the persisted contingency config.
    pub fn contingency_path(&self) -> PathBuf {
        self.state_dir.join(CONTINGENCY_FILE)
    }

    /// Restore the persisted contingency config, or a normal-mode config
    /// when nothing has been persisted yet.
    pub fn load_contingency(&self) -> Result<ContingencyConfig> {
        let path = self.contingency_path();
        if !path.exists() {
            return Ok(ContingencyConfig::new());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        ContingencyConfig::load(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Shared handle seeded from the persisted contingency config.
    pub fn contingency_handle(&self) -> Result<ContingencyHandle> {
        Ok(ContingencyHandle::new(self.load_contingency()?))
    }

    /// Persist `config` under `state_dir`.
    pub fn save_contingency(&self, config: &ContingencyConfig) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).with_context(|| {
            format!("failed to create state directory {}", self.state_dir.display())
        })?;
        let path = self.contingency_path();
        std::fs::write(&path, config.to_json())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "contingency config saved");
        Ok(())
    }
}
