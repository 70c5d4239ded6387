//! Signing errors.

use thiserror::Error;

/// Failure to sign a document or to verify its signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// The element to sign is not in the document.
    #[error("element {tag} not found")]
    MissingElement {
        /// Local name searched for.
        tag: String,
    },

    /// The element to sign carries no `Id` attribute to reference.
    #[error("element {tag} has no Id attribute")]
    MissingId {
        /// Local name of the element.
        tag: String,
    },

    /// The document has no `Signature` block, or it is incomplete.
    #[error("signature block missing or incomplete: {0}")]
    MissingSignature(String),

    /// The referenced content no longer hashes to the signed digest.
    #[error("digest mismatch: signed {signed}, computed {computed}")]
    DigestMismatch {
        /// `DigestValue` found in the signature.
        signed: String,
        /// Digest of the content as it is now.
        computed: String,
    },

    /// The signature value does not verify.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),
}
