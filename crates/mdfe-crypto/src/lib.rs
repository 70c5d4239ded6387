//! # mdfe-crypto
//!
//! Signing for manifests and events.
//!
//! - **Signer** (`signer.rs`): the [`Signer`] contract and
//!   [`Ed25519DocumentSigner`], which writes an enveloped `Signature`
//!   block whose `Reference/DigestValue` is what reconciliation compares.
//! - **Ed25519** (`ed25519.rs`): key pairs, public keys and signatures
//!   with hex serde.
//! - **SHA-256** (`sha256.rs`): reference digests of serialized elements.
//!
//! ## Crate Policy
//!
//! - Only [`SigningInput`] is signed; raw byte slices cannot be.
//! - Private keys are never serialized implicitly. The seed is only
//!   exposed through an explicitly named accessor for key files.

pub mod ed25519;
pub mod error;
pub mod sha256;
pub mod signer;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, SigningInput};
pub use error::SignError;
pub use sha256::{element_digest, sha256_hex};
pub use signer::{digest_value, verify_signature, Ed25519DocumentSigner, Signer};
