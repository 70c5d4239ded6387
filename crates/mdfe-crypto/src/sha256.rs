//! # SHA-256 Reference Digests
//!
//! The digest of a signed element is taken over its compact serialization
//! with any enveloped `Signature` child removed, so signing and
//! verification hash exactly the same bytes.

use mdfe_core::Element;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Digest of `element` as referenced by a signature.
pub fn element_digest(element: &Element) -> String {
    if element.first_child("Signature").is_none() {
        return sha256_hex(element.to_xml().as_bytes());
    }
    let mut stripped = element.clone();
    stripped.children.retain(|c| c.local_name() != "Signature");
    sha256_hex(stripped.to_xml().as_bytes())
}
