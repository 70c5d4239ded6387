//! # Contingency State Machine
//!
//! Models whether the emitter is issuing manifests normally or in offline
//! contingency, and remembers that decision across process restarts.
//!
//! ## States
//!
//! ```text
//!            activate(region, motive, mode)
//!   Normal ───────────────────────────────▶ OfflineFallback
//!   (tpEmis 1) ◀─────────────────────────── (tpEmis 2)
//!                      deactivate()
//! ```
//!
//! Activating while already in fallback re-stamps the motive and the
//! activation instant. `deactivate()` from any state yields a value equal
//! to a freshly constructed config.
//!
//! ## Persisted Form
//!
//! ```json
//! {"type":"OFFLINE","timestamp":1710000000,"motive":"Sefaz fora do ar","emissionTypeCode":2}
//! ```
//!
//! `type` is `""` in normal mode and `timestamp` is `0` when no activation
//! instant is recorded. Files written with the older `tpEmis` key load too.

use mdfe_core::text::sanitize;
use mdfe_core::{EmissionType, FederationUnit, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum motive length, in characters, after trimming.
pub const MAX_MOTIVE_CHARS: usize = 256;

// ─── Mode ────────────────────────────────────────────────────────────

/// Emission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContingencyMode {
    /// Online emission.
    #[default]
    #[serde(rename = "")]
    Normal,
    /// Offline contingency emission.
    #[serde(rename = "OFFLINE")]
    OfflineFallback,
}

impl ContingencyMode {
    /// Emission type code documents carry in this mode.
    pub fn emission_type(self) -> EmissionType {
        match self {
            Self::Normal => EmissionType::Normal,
            Self::OfflineFallback => EmissionType::Offline,
        }
    }

    /// Default fallback mode for a federation unit.
    ///
    /// Every unit authorizes manifests through the same national
    /// environment, so offline is the only fallback available.
    pub fn default_for(_unit: FederationUnit) -> Self {
        Self::OfflineFallback
    }

    /// Resolve a caller-supplied mode name. Blank means "the default for
    /// the region"; dashes and case are ignored.
    fn resolve(requested: Option<&str>, unit: FederationUnit) -> Result<Self, ContingencyError> {
        let normalized = requested
            .unwrap_or("")
            .trim()
            .to_ascii_uppercase()
            .replace('-', "");
        match normalized.as_str() {
            "" => Ok(Self::default_for(unit)),
            "OFFLINE" => Ok(Self::OfflineFallback),
            _ => Err(ContingencyError::UnsupportedMode {
                mode: requested.unwrap_or("").to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ContingencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => f.write_str("NORMAL"),
            Self::OfflineFallback => f.write_str("OFFLINE_FALLBACK"),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by contingency transitions and by loading persisted state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContingencyError {
    /// Activation requires a reason.
    #[error("contingency motive must not be empty")]
    EmptyMotive,

    /// The region is not a known federation unit.
    #[error("unknown region {0:?}")]
    UnknownRegion(String),

    /// Only offline contingency exists for the manifest.
    #[error("unsupported contingency mode {mode:?}; only OFFLINE is available")]
    UnsupportedMode {
        /// Mode as supplied by the caller.
        mode: String,
    },

    /// Persisted state is not well formed.
    #[error("malformed contingency config: {0}")]
    ConfigParse(String),
}

// ─── Config ──────────────────────────────────────────────────────────

/// Current emission-mode policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "PersistedConfig", try_from = "PersistedConfig")]
pub struct ContingencyConfig {
    mode: ContingencyMode,
    activated_at: Option<Timestamp>,
    motive: String,
    emission_type: EmissionType,
}

impl ContingencyConfig {
    /// A config in normal mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a config from its persisted JSON form.
    ///
    /// Only structure is checked; a persisted `OFFLINE` config with an
    /// empty motive loads as-is.
    pub fn load(serialized: &str) -> Result<Self, ContingencyError> {
        serde_json::from_str(serialized).map_err(|e| ContingencyError::ConfigParse(e.to_string()))
    }

    /// Render the persisted JSON form.
    pub fn to_json(&self) -> String {
        let persisted = PersistedConfig::from(self.clone());
        // Plain struct of strings and integers; serialization cannot fail.
        serde_json::to_string(&persisted).unwrap_or_default()
    }

    /// Enter offline contingency.
    ///
    /// `region` is the acronym of the emitter's federation unit and `mode`
    /// an optional explicit mode name. Inputs are validated before any
    /// field changes, so a rejected call leaves the config untouched.
    pub fn activate(
        &mut self,
        region: &str,
        motive: &str,
        mode: Option<&str>,
    ) -> Result<(), ContingencyError> {
        let unit = FederationUnit::from_acronym(region)
            .map_err(|_| ContingencyError::UnknownRegion(region.to_string()))?;
        let resolved = ContingencyMode::resolve(mode, unit)?;
        let motive = sanitize(motive, MAX_MOTIVE_CHARS);
        if motive.is_empty() {
            return Err(ContingencyError::EmptyMotive);
        }

        if self.is_active() {
            tracing::debug!(region = %unit, "contingency already active; re-stamping motive");
        }
        *self = Self {
            mode: resolved,
            activated_at: Some(Timestamp::now()),
            motive,
            emission_type: resolved.emission_type(),
        };
        tracing::info!(region = %unit, mode = %resolved, "contingency activated");
        Ok(())
    }

    /// Return to normal emission.
    pub fn deactivate(&mut self) {
        if self.is_active() {
            tracing::info!("contingency deactivated");
        }
        *self = Self::default();
    }

    /// Current mode.
    pub fn mode(&self) -> ContingencyMode {
        self.mode
    }

    /// Whether offline contingency is in effect.
    pub fn is_active(&self) -> bool {
        self.mode == ContingencyMode::OfflineFallback
    }

    /// When contingency was entered.
    pub fn activated_at(&self) -> Option<Timestamp> {
        self.activated_at
    }

    /// Sanitized reason for the contingency; empty in normal mode.
    pub fn motive(&self) -> &str {
        &self.motive
    }

    /// Emission type code documents must carry.
    pub fn emission_type(&self) -> EmissionType {
        self.emission_type
    }
}

impl std::fmt::Display for ContingencyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_json())
    }
}

// ─── Persisted Form ──────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersistedConfig {
    #[serde(rename = "type")]
    mode: ContingencyMode,
    timestamp: i64,
    motive: String,
    #[serde(rename = "emissionTypeCode", alias = "tpEmis")]
    emission_type: EmissionType,
}

impl From<ContingencyConfig> for PersistedConfig {
    fn from(config: ContingencyConfig) -> Self {
        Self {
            mode: config.mode,
            timestamp: config.activated_at.map_or(0, |t| t.epoch_secs()),
            motive: config.motive,
            emission_type: config.emission_type,
        }
    }
}

impl TryFrom<PersistedConfig> for ContingencyConfig {
    type Error = String;

    fn try_from(p: PersistedConfig) -> Result<Self, Self::Error> {
        let activated_at = match p.timestamp {
            0 => None,
            secs => Some(Timestamp::from_epoch_secs(secs).map_err(|e| e.to_string())?),
        };
        Ok(Self {
            mode: p.mode,
            activated_at,
            motive: p.motive,
            emission_type: p.emission_type,
        })
    }
}
