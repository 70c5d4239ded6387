//! # mdfe-core
//!
//! Foundational types shared by every crate of the MDF-e toolkit. Every
//! other crate in the workspace depends on `mdfe-core`; it depends on
//! nothing internal.
//!
//! ## Contents
//!
//! 1. **Access key codec** (`key`). Builds, parses and repairs the 44-digit
//!    access key and its modulo-11 check digit. Pure functions, no state.
//!
//! 2. **Domain codes** (`domain`, `uf`). Emission type, environment, and the
//!    27 federation units with their two-digit IBGE codes.
//!
//! 3. **Temporal types** (`temporal`). `Timestamp` for UTC bookkeeping and
//!    `FiscalDateTime` for document fields that keep their declared offset.
//!
//! 4. **XML element tree** (`xml`). The immutable, serializable tree every
//!    finalized document, event and authority response is expressed in.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mdfe-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod domain;
pub mod error;
pub mod key;
pub mod temporal;
pub mod text;
pub mod uf;
pub mod xml;

pub use domain::{EmissionType, Environment, DEFAULT_MODEL, DEFAULT_VERSION, MDFE_NAMESPACE};
pub use error::{KeyError, MdfeError, XmlError};
pub use key::{check_digit, validate_key_for_unit, AccessKey, KeyFields};
pub use temporal::{FiscalDateTime, Timestamp};
pub use uf::FederationUnit;
pub use xml::Element;
