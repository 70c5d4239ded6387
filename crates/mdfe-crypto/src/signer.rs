//! # Document Signer
//!
//! The [`Signer`] contract takes a document and the local name of the
//! element to sign (`infMDFe` for manifests, `infEvento` for events) and
//! returns the document with an enveloped `Signature` block appended to
//! the root:
//!
//! ```text
//! Signature
//! ├── SignedInfo
//! │   ├── CanonicalizationMethod
//! │   ├── SignatureMethod
//! │   └── Reference URI="#<Id>"
//! │       ├── Transforms
//! │       ├── DigestMethod
//! │       └── DigestValue
//! ├── SignatureValue
//! └── KeyInfo/KeyName
//! ```
//!
//! Reconciliation only reads `Reference/DigestValue`. The reference
//! signer uses SHA-256 over the element's compact serialization and
//! Ed25519 over `SignedInfo`; values are hex.

use mdfe_core::Element;

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, SigningInput};
use crate::error::SignError;
use crate::sha256::element_digest;

const DSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
const ENVELOPED: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const SIGNATURE_METHOD: &str = "http://www.w3.org/2021/04/xmldsig-more#eddsa-ed25519";
const DIGEST_METHOD: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// Produces signed documents.
pub trait Signer {
    /// Sign the element named `tag` inside `document`.
    fn sign(&self, document: &Element, tag: &str) -> Result<Element, SignError>;
}

/// Reference [`Signer`] backed by an Ed25519 key pair.
#[derive(Debug)]
pub struct Ed25519DocumentSigner {
    key: Ed25519KeyPair,
}

impl Ed25519DocumentSigner {
    /// Sign with `key`.
    pub fn new(key: Ed25519KeyPair) -> Self {
        Self { key }
    }

    /// Public key to verify with.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.key.public_key()
    }
}

fn target<'a>(document: &'a Element, tag: &str) -> Option<&'a Element> {
    if document.local_name() == tag {
        Some(document)
    } else {
        document.descendant(tag)
    }
}

fn by_id<'a>(element: &'a Element, id: &str) -> Option<&'a Element> {
    if element.attribute("Id") == Some(id) {
        return Some(element);
    }
    element.children.iter().find_map(|c| by_id(c, id))
}

impl Signer for Ed25519DocumentSigner {
    fn sign(&self, document: &Element, tag: &str) -> Result<Element, SignError> {
        let element = target(document, tag).ok_or_else(|| SignError::MissingElement {
            tag: tag.to_string(),
        })?;
        let id = element.attribute("Id").ok_or_else(|| SignError::MissingId {
            tag: tag.to_string(),
        })?;
        let digest = element_digest(element);

        let signed_info = Element::new("SignedInfo")
            .child(Element::new("CanonicalizationMethod").attr("Algorithm", C14N))
            .child(Element::new("SignatureMethod").attr("Algorithm", SIGNATURE_METHOD))
            .child(
                Element::new("Reference")
                    .attr("URI", format!("#{id}"))
                    .child(
                        Element::new("Transforms")
                            .child(Element::new("Transform").attr("Algorithm", ENVELOPED))
                            .child(Element::new("Transform").attr("Algorithm", C14N)),
                    )
                    .child(Element::new("DigestMethod").attr("Algorithm", DIGEST_METHOD))
                    .leaf("DigestValue", digest),
            );
        let signature = self.key.sign(&SigningInput::from_element(&signed_info));

        let block = Element::new("Signature")
            .attr("xmlns", DSIG_NAMESPACE)
            .child(signed_info)
            .leaf("SignatureValue", signature.to_hex())
            .child(Element::new("KeyInfo").leaf("KeyName", self.key.public_key().to_hex()));

        let mut signed = document.clone();
        signed.children.retain(|c| c.local_name() != "Signature");
        signed.children.push(block);
        Ok(signed)
    }
}

/// `Signature/SignedInfo/Reference/DigestValue` of a signed document.
pub fn digest_value(document: &Element) -> Option<&str> {
    document
        .find_text(&["Signature", "SignedInfo", "Reference", "DigestValue"])
        .map(str::trim)
}

/// Check that the referenced element still hashes to the signed digest and
/// that the signature over `SignedInfo` verifies under `public_key`.
pub fn verify_signature(document: &Element, public_key: &Ed25519PublicKey) -> Result<(), SignError> {
    let missing = |what: &str| SignError::MissingSignature(what.to_string());
    let signature = document.first_child("Signature").ok_or_else(|| missing("Signature"))?;
    let signed_info = signature
        .first_child("SignedInfo")
        .ok_or_else(|| missing("SignedInfo"))?;
    let uri = signed_info
        .first_child("Reference")
        .and_then(|r| r.attribute("URI"))
        .ok_or_else(|| missing("Reference/@URI"))?;
    let signed_digest = digest_value(document).ok_or_else(|| missing("DigestValue"))?;
    let value = signature
        .find_text(&["SignatureValue"])
        .ok_or_else(|| missing("SignatureValue"))?;

    let id = uri.trim_start_matches('#');
    let referenced = by_id(document, id).ok_or_else(|| SignError::MissingElement {
        tag: format!("Id={id}"),
    })?;
    let computed = element_digest(referenced);
    if computed != signed_digest {
        return Err(SignError::DigestMismatch {
            signed: signed_digest.to_string(),
            computed,
        });
    }

    let signature_value = Ed25519Signature::from_hex(value)?;
    public_key.verify(&SigningInput::from_element(signed_info), &signature_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Element {
        Element::new("MDFe").child(
            Element::new("infMDFe")
                .attr("Id", "MDFe41140581452880000139580010000000281611743166")
                .attr("versao", "3.00")
                .child(Element::new("ide").leaf("cUF", "41")),
        )
    }

    fn signer() -> Ed25519DocumentSigner {
        Ed25519DocumentSigner::new(Ed25519KeyPair::from_seed(&[3u8; 32]))
    }

    // ── signing ──

    #[test]
    fn test_sign_appends_signature_with_reference() {
        let signed = signer().sign(&document(), "infMDFe").unwrap();
        assert_eq!(signed.children.last().unwrap().name, "Signature");
        let reference = signed
            .find(&["Signature", "SignedInfo", "Reference"])
            .unwrap();
        assert_eq!(
            reference.attribute("URI"),
            Some("#MDFe41140581452880000139580010000000281611743166")
        );
        assert_eq!(
            digest_value(&signed),
            Some(element_digest(document().first_child("infMDFe").unwrap()).as_str())
        );
    }

    #[test]
    fn test_resigning_replaces_signature() {
        let s = signer();
        let once = s.sign(&document(), "infMDFe").unwrap();
        let twice = s.sign(&once, "infMDFe").unwrap();
        assert_eq!(twice.children_named("Signature").count(), 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_tag_and_id() {
        assert_eq!(
            signer().sign(&document(), "infEvento").unwrap_err(),
            SignError::MissingElement { tag: "infEvento".into() }
        );
        let no_id = Element::new("MDFe").child(Element::new("infMDFe"));
        assert_eq!(
            signer().sign(&no_id, "infMDFe").unwrap_err(),
            SignError::MissingId { tag: "infMDFe".into() }
        );
    }

    // ── verification ──

    #[test]
    fn test_verify_signed_document() {
        let s = signer();
        let signed = s.sign(&document(), "infMDFe").unwrap();
        verify_signature(&signed, &s.public_key()).unwrap();
    }

    #[test]
    fn test_tampered_content_is_digest_mismatch() {
        let s = signer();
        let mut signed = s.sign(&document(), "infMDFe").unwrap();
        signed.set_text_at(&["infMDFe", "ide", "cUF"], "35");
        assert!(matches!(
            verify_signature(&signed, &s.public_key()),
            Err(SignError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let signed = signer().sign(&document(), "infMDFe").unwrap();
        let other = Ed25519KeyPair::from_seed(&[4u8; 32]).public_key();
        assert!(matches!(
            verify_signature(&signed, &other),
            Err(SignError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_unsigned_document() {
        assert!(matches!(
            verify_signature(&document(), &signer().public_key()),
            Err(SignError::MissingSignature(_))
        ));
        assert_eq!(digest_value(&document()), None);
    }
}
