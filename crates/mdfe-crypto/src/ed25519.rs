//! # Ed25519 Keys and Signatures
//!
//! Key generation, signing and verification for the reference document
//! signer.
//!
//! ## Invariants
//!
//! - Signing input is `&SigningInput`, built from an element's compact
//!   serialization. Raw byte slices cannot be signed.
//! - `Ed25519KeyPair` does not implement `Serialize`. The seed is only
//!   exposed through [`Ed25519KeyPair::seed_hex`], for key files.
//! - Public keys and signatures serialize as lowercase hex strings.

use ed25519_dalek::{Signer as _, Verifier};
use mdfe_core::Element;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SignError;

/// Bytes a signature is computed over: the serialized `SignedInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningInput(Vec<u8>);

impl SigningInput {
    /// Serialize `element` compactly.
    pub fn from_element(element: &Element) -> Self {
        Self(element.to_xml().into_bytes())
    }

    /// The bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ─── Ed25519PublicKey ────────────────────────────────────────────────

impl Ed25519PublicKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Parse 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, SignError> {
        let bytes = hex_array::<32>(hex).map_err(SignError::KeyError)?;
        Ok(Self(bytes))
    }

    /// Convert for verification.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, SignError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| SignError::KeyError(format!("invalid public key: {e}")))
    }

    /// Verify `signature` over `data`.
    pub fn verify(&self, data: &SigningInput, signature: &Ed25519Signature) -> Result<(), SignError> {
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.to_verifying_key()?
            .verify(data.as_bytes(), &sig)
            .map_err(|e| SignError::VerificationFailed(e.to_string()))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", to_hex(&self.0[..4]))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ─── Ed25519Signature ────────────────────────────────────────────────

impl Ed25519Signature {
    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Parse 128 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, SignError> {
        let bytes = hex_array::<64>(hex).map_err(SignError::VerificationFailed)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", to_hex(&self.0[..4]))
    }
}

// ─── Ed25519KeyPair ──────────────────────────────────────────────────

impl Ed25519KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Key pair from a 64-character hex seed, as written by [`Self::seed_hex`].
    pub fn from_seed_hex(hex: &str) -> Result<Self, SignError> {
        let seed = hex_array::<32>(hex).map_err(SignError::KeyError)?;
        Ok(Self::from_seed(&seed))
    }

    /// The private seed as hex. Only for writing key files.
    pub fn seed_hex(&self) -> String {
        to_hex(&self.signing_key.to_bytes())
    }

    /// The public half.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign serialized signing input.
    pub fn sign(&self, data: &SigningInput) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

// ─── Hex ─────────────────────────────────────────────────────────────

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_array<const N: usize>(hex: &str) -> Result<[u8; N], String> {
    let hex = hex.trim();
    if hex.len() != N * 2 {
        return Err(format!("expected {} hex chars, got {}", N * 2, hex.len()));
    }
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        let pair = hex
            .get(i * 2..i * 2 + 2)
            .ok_or_else(|| format!("invalid hex at position {}", i * 2))?;
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|e| format!("invalid hex at position {}: {e}", i * 2))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> SigningInput {
        SigningInput::from_element(&Element::with_text("SignedInfo", text))
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Ed25519KeyPair::generate();
        let data = input("hello");
        let sig = kp.sign(&data);
        kp.public_key().verify(&data, &sig).unwrap();
    }

    #[test]
    fn test_verify_wrong_key_fails() {
        let kp1 = Ed25519KeyPair::generate();
        let kp2 = Ed25519KeyPair::generate();
        let data = input("x");
        let sig = kp1.sign(&data);
        assert!(matches!(
            kp2.public_key().verify(&data, &sig),
            Err(SignError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_verify_wrong_message_fails() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign(&input("original"));
        assert!(kp.public_key().verify(&input("tampered"), &sig).is_err());
    }

    #[test]
    fn test_seed_hex_roundtrip() {
        let kp = Ed25519KeyPair::from_seed(&[7u8; 32]);
        let restored = Ed25519KeyPair::from_seed_hex(&kp.seed_hex()).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
        assert_eq!(kp.sign(&input("a")), restored.sign(&input("a")));
    }

    #[test]
    fn test_bad_hex_is_rejected() {
        assert!(Ed25519PublicKey::from_hex("abcd").is_err());
        assert!(Ed25519KeyPair::from_seed_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_public_key_serde_json_roundtrip() {
        let pk = Ed25519KeyPair::generate().public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: Ed25519PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }

    #[test]
    fn test_debug_hides_private_key() {
        let kp = Ed25519KeyPair::from_seed(&[1u8; 32]);
        assert_eq!(format!("{kp:?}"), "Ed25519KeyPair(<private>)");
    }
}
