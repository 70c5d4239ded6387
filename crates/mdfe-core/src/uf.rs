//! # Federation Units
//!
//! The 27 Brazilian federation units with their two-digit IBGE codes. The
//! code is the first field of every access key; the acronym is how callers
//! name the unit when switching contingency mode.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::KeyError;

/// A Brazilian federation unit (state or federal district).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FederationUnit {
    RO,
    AC,
    AM,
    RR,
    PA,
    AP,
    TO,
    MA,
    PI,
    CE,
    RN,
    PB,
    PE,
    AL,
    SE,
    BA,
    MG,
    ES,
    RJ,
    SP,
    PR,
    SC,
    RS,
    MS,
    MT,
    GO,
    DF,
}

/// Number of federation units.
pub const FEDERATION_UNIT_COUNT: usize = 27;

impl FederationUnit {
    /// Every federation unit, ordered by IBGE code.
    pub fn all() -> &'static [FederationUnit; FEDERATION_UNIT_COUNT] {
        use FederationUnit::*;
        &[
            RO, AC, AM, RR, PA, AP, TO, MA, PI, CE, RN, PB, PE, AL, SE, BA, MG, ES, RJ, SP, PR,
            SC, RS, MS, MT, GO, DF,
        ]
    }

    /// Two-digit IBGE code (`cUF`).
    pub fn code(self) -> u8 {
        use FederationUnit::*;
        match self {
            RO => 11,
            AC => 12,
            AM => 13,
            RR => 14,
            PA => 15,
            AP => 16,
            TO => 17,
            MA => 21,
            PI => 22,
            CE => 23,
            RN => 24,
            PB => 25,
            PE => 26,
            AL => 27,
            SE => 28,
            BA => 29,
            MG => 31,
            ES => 32,
            RJ => 33,
            SP => 35,
            PR => 41,
            SC => 42,
            RS => 43,
            MS => 50,
            MT => 51,
            GO => 52,
            DF => 53,
        }
    }

    /// Two-letter acronym.
    pub fn acronym(self) -> &'static str {
        use FederationUnit::*;
        match self {
            RO => "RO",
            AC => "AC",
            AM => "AM",
            RR => "RR",
            PA => "PA",
            AP => "AP",
            TO => "TO",
            MA => "MA",
            PI => "PI",
            CE => "CE",
            RN => "RN",
            PB => "PB",
            PE => "PE",
            AL => "AL",
            SE => "SE",
            BA => "BA",
            MG => "MG",
            ES => "ES",
            RJ => "RJ",
            SP => "SP",
            PR => "PR",
            SC => "SC",
            RS => "RS",
            MS => "MS",
            MT => "MT",
            GO => "GO",
            DF => "DF",
        }
    }

    /// Look up a unit by IBGE code.
    pub fn from_code(code: u8) -> Result<Self, KeyError> {
        Self::all()
            .iter()
            .copied()
            .find(|uf| uf.code() == code)
            .ok_or_else(|| KeyError::UnknownFederationUnit(code.to_string()))
    }

    /// Look up a unit by acronym, case-insensitively.
    pub fn from_acronym(acronym: &str) -> Result<Self, KeyError> {
        let wanted = acronym.trim().to_ascii_uppercase();
        Self::all()
            .iter()
            .copied()
            .find(|uf| uf.acronym() == wanted)
            .ok_or_else(|| KeyError::UnknownFederationUnit(acronym.to_string()))
    }
}

impl std::fmt::Display for FederationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.acronym())
    }
}

impl FromStr for FederationUnit {
    type Err = KeyError;

    /// Accepts either the acronym (`PR`) or the IBGE code (`41`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u8>() {
            Ok(code) => Self::from_code(code),
            Err(_) => Self::from_acronym(s),
        }
    }
}
