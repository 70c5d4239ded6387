//! # mdfe-cli: CLI Tool for the MDF-e Toolkit
//!
//! Provides the `mdfe` command-line interface over the library crates.
//!
//! ## Subcommands
//!
//! - `mdfe key`: Access-key build, check and recompute.
//! - `mdfe contingency`: Persisted emission-mode status and transitions.
//! - `mdfe build` / `mdfe adjust`: Manifest assembly and re-keying.
//! - `mdfe keygen` / `mdfe sign` / `mdfe verify`: Reference signing.
//! - `mdfe event`: Cancellation, closure and driver-inclusion requests.
//! - `mdfe reconcile`: Authority response reconciliation.
//!
//! Handlers return `anyhow::Result<u8>`; the value is the process exit
//! code. Settings come from [`config::EmitterConfig`].
//!
//! ```bash
//! mdfe --config mdfe.yaml contingency activate --motive "SEFAZ fora do ar"
//! mdfe build manifest.yaml --out mdfe.xml
//! mdfe sign mdfe.xml --key mdfe.key --out signed.xml
//! mdfe reconcile authorization signed.xml --response ret.xml
//! ```

pub mod config;
pub mod contingency;
pub mod event;
pub mod key;
pub mod manifest;
pub mod reconcile;
pub mod signing;
