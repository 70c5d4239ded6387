//! # Access Key Codec
//!
//! Builds, parses and repairs the 44-digit access key that uniquely
//! addresses one manifest.
//!
//! ## Layout
//!
//! ```text
//! cUF(2) AA(2) MM(2) CNPJ(14) mod(2) serie(3) nMDF(9) tpEmis(1) cMDF(8) cDV(1)
//! ```
//!
//! ## Check Digit
//!
//! Weighted modulo 11 over the first 43 digits. Weights cycle `2..=9`
//! starting from the least-significant digit. A remainder of 0 or 1 maps
//! to digit 0; otherwise the digit is `11 - remainder`.
//!
//! ## Invariant
//!
//! An [`AccessKey`] value always holds 44 ASCII digits whose last digit is
//! the check digit of the first 43. Every constructor enforces this.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyError;
use crate::uf::FederationUnit;

/// Number of digits in a complete access key.
pub const ACCESS_KEY_LEN: usize = 44;

/// Number of digits covered by the check digit.
pub const KEY_PREFIX_LEN: usize = 43;

/// Component widths in key order.
const WIDTHS: [(&str, usize); 9] = [
    ("uf_code", 2),
    ("year", 2),
    ("month", 2),
    ("tax_id", 14),
    ("model", 2),
    ("series", 3),
    ("number", 9),
    ("emission_type", 1),
    ("control_number", 8),
];

/// The nine components an access key is built from.
///
/// Values are decimal strings; each is zero-padded on the left to its
/// fixed width. An 11-digit CPF in `tax_id` becomes 14 digits this way.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyFields {
    /// Federation-unit IBGE code (`cUF`).
    pub uf_code: String,
    /// Two-digit emission year.
    pub year: String,
    /// Two-digit emission month.
    pub month: String,
    /// Issuer CNPJ, or CPF for individual issuers.
    pub tax_id: String,
    /// Document model, `58` for the manifest.
    pub model: String,
    /// Series.
    pub series: String,
    /// Sequence number within the series.
    pub number: String,
    /// Emission type code (`tpEmis`).
    pub emission_type: String,
    /// Random control number (`cMDF`).
    pub control_number: String,
}

impl KeyFields {
    fn values(&self) -> [&str; 9] {
        [
            self.uf_code.as_str(),
            self.year.as_str(),
            self.month.as_str(),
            self.tax_id.as_str(),
            self.model.as_str(),
            self.series.as_str(),
            self.number.as_str(),
            self.emission_type.as_str(),
            self.control_number.as_str(),
        ]
    }

    /// Concatenate the padded components into the 43-digit prefix.
    pub fn prefix(&self) -> Result<String, KeyError> {
        let mut prefix = String::with_capacity(KEY_PREFIX_LEN);
        for ((field, width), value) in WIDTHS.iter().zip(self.values()) {
            prefix.push_str(&pad(*field, value, *width)?);
        }
        Ok(prefix)
    }
}

fn pad(field: &'static str, value: &str, width: usize) -> Result<String, KeyError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(KeyError::MalformedField {
            field,
            reason: "value is empty".to_string(),
        });
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KeyError::MalformedField {
            field,
            reason: format!("{value:?} is not numeric"),
        });
    }
    if value.len() > width {
        return Err(KeyError::MalformedField {
            field,
            reason: format!("{value:?} exceeds width {width}"),
        });
    }
    Ok(format!("{value:0>width$}"))
}

fn ensure_digits(s: &str) -> Result<(), KeyError> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(KeyError::NonNumeric(s.to_string()))
    }
}

fn modulo11(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .zip((2u32..=9).cycle())
        .map(|(d, w)| u32::from(d - b'0') * w)
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        r => (11 - r) as u8,
    }
}

/// Compute the check digit of a 43-digit key prefix.
pub fn check_digit(prefix: &str) -> Result<u8, KeyError> {
    if prefix.len() != KEY_PREFIX_LEN {
        return Err(KeyError::InvalidLength {
            expected: KEY_PREFIX_LEN,
            actual: prefix.len(),
        });
    }
    ensure_digits(prefix)?;
    Ok(modulo11(prefix.as_bytes()))
}

/// A verified 44-digit access key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccessKey(String);

impl AccessKey {
    /// Build a key from its components.
    ///
    /// # Errors
    ///
    /// [`KeyError::MalformedField`] when any component is empty, non-numeric
    /// or wider than its slot.
    pub fn build(fields: &KeyFields) -> Result<Self, KeyError> {
        let prefix = fields.prefix()?;
        let dv = modulo11(prefix.as_bytes());
        Ok(Self(format!("{prefix}{dv}")))
    }

    /// Parse a complete key, verifying its check digit.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let raw = raw.trim();
        if raw.len() != ACCESS_KEY_LEN {
            return Err(KeyError::InvalidLength {
                expected: ACCESS_KEY_LEN,
                actual: raw.len(),
            });
        }
        ensure_digits(raw)?;
        let computed = modulo11(&raw.as_bytes()[..KEY_PREFIX_LEN]);
        let declared = raw.as_bytes()[KEY_PREFIX_LEN] - b'0';
        if computed != declared {
            return Err(KeyError::CheckDigitMismatch { declared, computed });
        }
        Ok(Self(raw.to_string()))
    }

    /// Parse the digits out of a document `Id` attribute (`MDFe4114...`).
    pub fn from_document_id(id: &str) -> Result<Self, KeyError> {
        let digits: String = id.chars().filter(char::is_ascii_digit).collect();
        Self::parse(&digits)
    }

    /// Re-derive the check digit of an existing key from its 43 leading
    /// digits, discarding whatever trailing digit it carried.
    ///
    /// Accepts a bare 43-digit prefix as well as a 44-digit key.
    pub fn recompute(existing: &str) -> Result<Self, KeyError> {
        let existing = existing.trim();
        if existing.len() != KEY_PREFIX_LEN && existing.len() != ACCESS_KEY_LEN {
            return Err(KeyError::InvalidLength {
                expected: ACCESS_KEY_LEN,
                actual: existing.len(),
            });
        }
        ensure_digits(existing)?;
        let prefix = &existing[..KEY_PREFIX_LEN];
        let dv = modulo11(prefix.as_bytes());
        Ok(Self(format!("{prefix}{dv}")))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first 43 digits.
    pub fn prefix(&self) -> &str {
        &self.0[..KEY_PREFIX_LEN]
    }

    /// The trailing check digit.
    pub fn check_digit(&self) -> u8 {
        self.0.as_bytes()[KEY_PREFIX_LEN] - b'0'
    }

    /// Decompose the key into its components.
    pub fn fields(&self) -> KeyFields {
        let mut parts = Vec::with_capacity(WIDTHS.len());
        let mut offset = 0;
        for (_, width) in WIDTHS {
            parts.push(self.0[offset..offset + width].to_string());
            offset += width;
        }
        let mut it = parts.into_iter();
        let mut next = || it.next().unwrap_or_default();
        KeyFields {
            uf_code: next(),
            year: next(),
            month: next(),
            tax_id: next(),
            model: next(),
            series: next(),
            number: next(),
            emission_type: next(),
            control_number: next(),
        }
    }

    /// Federation unit encoded in the first two digits.
    pub fn federation_unit(&self) -> Result<FederationUnit, KeyError> {
        let code: u8 = self.0[..2]
            .parse()
            .map_err(|_| KeyError::NonNumeric(self.0[..2].to_string()))?;
        FederationUnit::from_code(code)
    }

    /// The `Id` attribute value of the manifest's `infMDFe` (`MDFe{key}`).
    pub fn to_document_id(&self) -> String {
        format!("MDFe{}", self.0)
    }
}

/// Check that a key was issued for the given federation unit.
pub fn validate_key_for_unit(key: &AccessKey, acronym: &str) -> Result<(), KeyError> {
    let expected = FederationUnit::from_acronym(acronym)?;
    let found = key.federation_unit()?;
    if found != expected {
        return Err(KeyError::FederationUnitMismatch {
            expected: expected.acronym().to_string(),
            found: found.acronym().to_string(),
        });
    }
    Ok(())
}

impl std::fmt::Display for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessKey({})", self.0)
    }
}

impl std::str::FromStr for AccessKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AccessKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccessKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
