//! # Domain Codes
//!
//! Emission type and environment codes that appear in every manifest, and
//! the fixed constants of the MDF-e layout.
//!
//! Both enums serialize as their numeric code, which is how they appear in
//! the document (`tpEmis`, `tpAmb`) and in the persisted contingency record.

use serde::{Deserialize, Serialize};

/// XML namespace of every manifest, event and processed envelope.
pub const MDFE_NAMESPACE: &str = "http://www.portalfiscal.inf.br/mdfe";

/// Layout version used when the caller does not declare one.
pub const DEFAULT_VERSION: &str = "3.00";

/// Document model code of the transport manifest.
pub const DEFAULT_MODEL: &str = "58";

/// Base URL of the supplementary QR code block.
pub const QR_CODE_BASE_URL: &str = "https://dfe-portal.svrs.rs.gov.br/mdfe/qrCode";

/// How the manifest was emitted (`tpEmis`).
///
/// | Code | Variant | Meaning |
/// |------|---------|---------|
/// | 1 | `Normal` | Authorized online before the trip |
/// | 2 | `Offline` | Emitted in offline contingency |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EmissionType {
    /// Normal online emission.
    #[default]
    Normal = 1,
    /// Offline contingency emission.
    Offline = 2,
}

impl EmissionType {
    /// The numeric `tpEmis` code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up an emission type by its numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Normal),
            2 => Some(Self::Offline),
            _ => None,
        }
    }
}

impl TryFrom<u8> for EmissionType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown emission type code {code}"))
    }
}

impl From<EmissionType> for u8 {
    fn from(value: EmissionType) -> Self {
        value.code()
    }
}

impl std::fmt::Display for EmissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => f.write_str("NORMAL"),
            Self::Offline => f.write_str("OFFLINE"),
        }
    }
}

/// Authority environment (`tpAmb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Environment {
    /// Production: documents carry legal value.
    Production = 1,
    /// Homologation (test) environment.
    #[default]
    Homologation = 2,
}

impl Environment {
    /// The numeric `tpAmb` code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up an environment by its numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Production),
            2 => Some(Self::Homologation),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Environment {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown environment code {code}"))
    }
}

impl From<Environment> for u8 {
    fn from(value: Environment) -> Self {
        value.code()
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => f.write_str("PRODUCTION"),
            Self::Homologation => f.write_str("HOMOLOGATION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emission_type_codes() {
        assert_eq!(EmissionType::Normal.code(), 1);
        assert_eq!(EmissionType::Offline.code(), 2);
        assert_eq!(EmissionType::from_code(2), Some(EmissionType::Offline));
        assert_eq!(EmissionType::from_code(9), None);
    }

    #[test]
    fn test_emission_type_serializes_as_number() {
        let json = serde_json::to_string(&EmissionType::Offline).unwrap();
        assert_eq!(json, "2");
        let back: EmissionType = serde_json::from_str("1").unwrap();
        assert_eq!(back, EmissionType::Normal);
        assert!(serde_json::from_str::<EmissionType>("7").is_err());
    }

    #[test]
    fn test_environment_default_is_homologation() {
        assert_eq!(Environment::default(), Environment::Homologation);
        assert_eq!(Environment::default().code(), 2);
    }

    #[test]
    fn test_display_is_screaming_case() {
        assert_eq!(EmissionType::Offline.to_string(), "OFFLINE");
        assert_eq!(Environment::Production.to_string(), "PRODUCTION");
    }
}
