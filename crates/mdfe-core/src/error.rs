//! # Error Types
//!
//! Errors raised by the foundational types. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! - Key errors name the offending field and the width it must fit.
//! - XML errors carry the byte position where reading stopped.

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum MdfeError {
    /// Access key could not be built, parsed or repaired.
    #[error("access key error: {0}")]
    Key(#[from] KeyError),

    /// XML payload could not be read.
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),

    /// Timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    Temporal(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error in access-key construction or verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A key component is empty, non-numeric, or wider than its slot.
    #[error("malformed key field {field}: {reason}")]
    MalformedField {
        /// Name of the key component (e.g. `series`).
        field: &'static str,
        /// Human-readable description of the defect.
        reason: String,
    },

    /// The key (or key prefix) has the wrong number of digits.
    #[error("access key must have {expected} digits, got {actual}")]
    InvalidLength {
        /// Required digit count.
        expected: usize,
        /// Digit count received.
        actual: usize,
    },

    /// The key contains something other than ASCII digits.
    #[error("access key contains non-numeric characters: {0:?}")]
    NonNumeric(String),

    /// The trailing digit does not match the modulo-11 digit of the prefix.
    #[error("check digit mismatch: declared {declared}, computed {computed}")]
    CheckDigitMismatch {
        /// Digit found at position 44.
        declared: u8,
        /// Digit computed from the first 43 digits.
        computed: u8,
    },

    /// A federation-unit code or acronym is not in the IBGE table.
    #[error("unknown federation unit: {0}")]
    UnknownFederationUnit(String),

    /// The key was issued for a different federation unit.
    #[error("access key belongs to federation unit {found}, expected {expected}")]
    FederationUnitMismatch {
        /// Acronym the document is being submitted to.
        expected: String,
        /// Acronym encoded in the key.
        found: String,
    },
}

/// Error while reading an XML payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// Input ended inside an element.
    #[error("unexpected end of input at byte {position}")]
    UnexpectedEof {
        /// Byte offset where input ran out.
        position: usize,
    },

    /// Input is not well formed.
    #[error("malformed xml at byte {position}: {reason}")]
    Malformed {
        /// Byte offset of the defect.
        position: usize,
        /// What was expected.
        reason: String,
    },

    /// A closing tag does not match the open element.
    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        /// Name of the open element.
        expected: String,
        /// Name found in the closing tag.
        found: String,
    },

    /// An entity reference that is neither predefined nor numeric.
    #[error("unknown entity reference &{0};")]
    UnknownEntity(String),
}
