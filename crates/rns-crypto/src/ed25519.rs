//! Ed25519 digital signatures.

use crate::CryptoError;
use ed25519_dalek::{Signer, Verifier};

/// An Ed25519 private (signing) key wrapping the 32-byte seed.
#[derive(Debug)]
pub struct Ed25519PrivateKey(ed25519_dalek::SigningKey);

impl Ed25519PrivateKey {
    /// Generate a new random Ed25519 private key.
    #[must_use]
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create a private key from the raw 32-byte seed.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Derive the corresponding public key.
    #[must_use]
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verifying_key())
    }

    /// Sign a message, returning the 64-byte signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.0.sign(message))
    }

    /// Extract the 32-byte seed.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

/// An Ed25519 public (verifying) key, the 32-byte compressed Edwards point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(ed25519_dalek::VerifyingKey);

impl Ed25519PublicKey {
    /// Create a public key from its compressed Edwards point representation.
    ///
    /// Fails if the bytes do not represent a valid point on the curve.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 32,
            })
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        self.0
            .verify(message, &signature.0)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519Signature(ed25519_dalek::Signature);

impl Ed25519Signature {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(ed25519_dalek::Signature::from_bytes(&bytes))
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let key = Ed25519PrivateKey::generate();
        let message = b"signed message";
        let sig = key.sign(message);
        assert!(key.public_key().verify(message, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_modified_message() {
        let key = Ed25519PrivateKey::generate();
        let sig = key.sign(b"original message");
        assert_eq!(
            key.public_key().verify(b"modified message", &sig),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn verify_rejects_modified_signature() {
        let key = Ed25519PrivateKey::generate();
        let message = b"message";
        let mut sig_bytes = key.sign(message).to_bytes();
        sig_bytes[0] ^= 0x01;
        let tampered = Ed25519Signature::from_bytes(sig_bytes);
        assert!(key.public_key().verify(message, &tampered).is_err());
    }

    #[test]
    fn seed_roundtrip_preserves_keys() {
        let key = Ed25519PrivateKey::generate();
        let restored = Ed25519PrivateKey::from_bytes(key.to_bytes());
        assert_eq!(key.public_key(), restored.public_key());

        let sig = restored.sign(b"cross-check");
        assert!(key.public_key().verify(b"cross-check", &sig).is_ok());
    }

    #[test]
    fn signature_bytes_roundtrip() {
        let key = Ed25519PrivateKey::generate();
        let sig = key.sign(b"roundtrip");
        let restored = Ed25519Signature::from_bytes(sig.to_bytes());
        assert_eq!(sig, restored);
    }
}
