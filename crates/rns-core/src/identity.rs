//! Identity key management.
//!
//! An [`Identity`] bundles an X25519 key pair (key exchange) and an Ed25519
//! key pair (signing). The identity hash is
//! `SHA-256(x25519_pub || ed25519_pub)[:16]`. Private keys never leave this
//! type except through the explicit 64-byte persistence serialization.

use rns_crypto::ed25519::{Ed25519PrivateKey, Ed25519PublicKey, Ed25519Signature};
use rns_crypto::hkdf::hkdf;
use rns_crypto::sha::sha256;
use rns_crypto::token::Token;
use rns_crypto::x25519::{X25519PrivateKey, X25519PublicKey};

use crate::constants::{KEYSIZE, TOKEN_OVERHEAD};
use crate::error::IdentityError;
use crate::types::IdentityHash;

/// A network identity with optional private keys.
///
/// A full identity can sign, decrypt and announce destinations. A
/// public-only identity can verify signatures and encrypt to the holder.
#[must_use]
pub struct Identity {
    x25519_private: Option<X25519PrivateKey>,
    ed25519_private: Option<Ed25519PrivateKey>,
    x25519_public: X25519PublicKey,
    ed25519_public: Ed25519PublicKey,
    hash: IdentityHash,
}

impl Identity {
    /// Generate a new random identity with both key pairs.
    pub fn generate() -> Self {
        let x25519_private = X25519PrivateKey::generate();
        let ed25519_private = Ed25519PrivateKey::generate();
        let x25519_public = x25519_private.public_key();
        let ed25519_public = ed25519_private.public_key();
        let hash = compute_hash(&x25519_public, &ed25519_public);

        Identity {
            x25519_private: Some(x25519_private),
            ed25519_private: Some(ed25519_private),
            x25519_public,
            ed25519_public,
            hash,
        }
    }

    /// Restore an identity from 64 raw private key bytes:
    /// `x25519_private(32) || ed25519_private(32)`.
    pub fn from_private_bytes(bytes: &[u8; 64]) -> Self {
        let mut x25519_bytes = [0u8; 32];
        let mut ed25519_bytes = [0u8; 32];
        x25519_bytes.copy_from_slice(&bytes[..32]);
        ed25519_bytes.copy_from_slice(&bytes[32..]);

        let x25519_private = X25519PrivateKey::from_bytes(x25519_bytes);
        let ed25519_private = Ed25519PrivateKey::from_bytes(ed25519_bytes);
        let x25519_public = x25519_private.public_key();
        let ed25519_public = ed25519_private.public_key();
        let hash = compute_hash(&x25519_public, &ed25519_public);

        Identity {
            x25519_private: Some(x25519_private),
            ed25519_private: Some(ed25519_private),
            x25519_public,
            ed25519_public,
            hash,
        }
    }

    /// Create a public-only identity from 64 raw public key bytes:
    /// `x25519_public(32) || ed25519_public(32)`.
    pub fn from_public_bytes(bytes: &[u8; 64]) -> Result<Self, IdentityError> {
        let mut x25519_bytes = [0u8; 32];
        let mut ed25519_bytes = [0u8; 32];
        x25519_bytes.copy_from_slice(&bytes[..32]);
        ed25519_bytes.copy_from_slice(&bytes[32..]);

        let x25519_public = X25519PublicKey::from_bytes(x25519_bytes);
        let ed25519_public = Ed25519PublicKey::from_bytes(ed25519_bytes)?;
        let hash = compute_hash(&x25519_public, &ed25519_public);

        Ok(Identity {
            x25519_private: None,
            ed25519_private: None,
            x25519_public,
            ed25519_public,
            hash,
        })
    }

    /// Whether this identity holds private keys.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.x25519_private.is_some() && self.ed25519_private.is_some()
    }

    /// The 64 raw private key bytes, or `None` for public-only identities.
    #[must_use]
    pub fn private_key_bytes(&self) -> Option<[u8; 64]> {
        let x25519_prv = self.x25519_private.as_ref()?;
        let ed25519_prv = self.ed25519_private.as_ref()?;
        let mut result = [0u8; 64];
        result[..32].copy_from_slice(&x25519_prv.to_bytes());
        result[32..].copy_from_slice(&ed25519_prv.to_bytes());
        Some(result)
    }

    /// The 64-byte combined public key: `x25519_public(32) || ed25519_public(32)`.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; 64] {
        let mut result = [0u8; 64];
        result[..32].copy_from_slice(&self.x25519_public.to_bytes());
        result[32..].copy_from_slice(&self.ed25519_public.to_bytes());
        result
    }

    /// The 16-byte identity hash.
    pub fn hash(&self) -> &IdentityHash {
        &self.hash
    }

    pub fn x25519_public(&self) -> &X25519PublicKey {
        &self.x25519_public
    }

    pub fn ed25519_public(&self) -> &Ed25519PublicKey {
        &self.ed25519_public
    }

    pub fn x25519_private(&self) -> Option<&X25519PrivateKey> {
        self.x25519_private.as_ref()
    }

    pub fn ed25519_private(&self) -> Option<&Ed25519PrivateKey> {
        self.ed25519_private.as_ref()
    }

    /// Sign data with the Ed25519 private key.
    pub fn sign(&self, data: &[u8]) -> Result<Ed25519Signature, IdentityError> {
        let key = self
            .ed25519_private
            .as_ref()
            .ok_or(IdentityError::NoPrivateKey)?;
        Ok(key.sign(data))
    }

    /// Verify an Ed25519 signature against this identity's public key.
    pub fn verify(&self, data: &[u8], signature: &Ed25519Signature) -> Result<(), IdentityError> {
        self.ed25519_public
            .verify(data, signature)
            .map_err(|_| IdentityError::SignatureVerificationFailed)
    }

    /// Encrypt data to this identity's long-term X25519 key.
    ///
    /// Output: `ephemeral_public(32) || Token(IV(16) || ciphertext || HMAC(32))`.
    #[must_use = "returns the ciphertext without modifying the identity"]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        self.encrypt_to_key(plaintext, &self.x25519_public)
    }

    /// Encrypt data to an explicit target X25519 key (a ratchet key), still
    /// salting the derivation with this identity's hash.
    #[must_use = "returns the ciphertext without modifying the identity"]
    pub fn encrypt_to_key(&self, plaintext: &[u8], target: &X25519PublicKey) -> Vec<u8> {
        let ephemeral = X25519PrivateKey::generate();
        let ephemeral_public = ephemeral.public_key();
        let shared_secret = ephemeral.diffie_hellman(target);
        let token = derive_token(&shared_secret, &self.hash);
        let token_bytes = token.encrypt(plaintext);

        let mut result = Vec::with_capacity(32 + token_bytes.len());
        result.extend_from_slice(&ephemeral_public.to_bytes());
        result.extend_from_slice(&token_bytes);
        result
    }

    /// Decrypt data encrypted to this identity's long-term key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let private = self
            .x25519_private
            .as_ref()
            .ok_or(IdentityError::NoPrivateKey)?;
        self.decrypt_with_key(ciphertext, private)
    }

    /// Decrypt data encrypted to an explicit X25519 private key (a ratchet
    /// key held by this identity).
    pub fn decrypt_with_key(
        &self,
        ciphertext: &[u8],
        private: &X25519PrivateKey,
    ) -> Result<Vec<u8>, IdentityError> {
        if ciphertext.len() < 32 + TOKEN_OVERHEAD {
            return Err(IdentityError::PayloadTooShort {
                min: 32 + TOKEN_OVERHEAD,
                actual: ciphertext.len(),
            });
        }

        let ephemeral_bytes: [u8; 32] = ciphertext[..32]
            .try_into()
            .expect("slice is exactly 32 bytes");
        let ephemeral_public = X25519PublicKey::from_bytes(ephemeral_bytes);
        let shared_secret = private.diffie_hellman(&ephemeral_public);

        let token = derive_token(&shared_secret, &self.hash);
        token
            .decrypt(&ciphertext[32..])
            .map_err(|_| IdentityError::DecryptionFailed)
    }
}

/// Derive the token key from a DH shared secret, salted by the recipient's
/// identity hash.
fn derive_token(shared_secret: &[u8; 32], identity_hash: &IdentityHash) -> Token {
    let derived = hkdf(KEYSIZE, shared_secret, Some(identity_hash.as_ref()), None);
    let key: [u8; 64] = derived.try_into().expect("HKDF always returns 64 bytes");
    Token::new(&key)
}

/// Compute the identity hash from the two public keys.
fn compute_hash(x25519: &X25519PublicKey, ed25519: &Ed25519PublicKey) -> IdentityHash {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(&x25519.to_bytes());
    combined[32..].copy_from_slice(&ed25519.to_bytes());
    let full = sha256(&combined);
    let mut truncated = [0u8; 16];
    truncated.copy_from_slice(&full[..16]);
    IdentityHash::new(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_16_bytes() {
        let identity = Identity::generate();
        let restored = Identity::from_private_bytes(&identity.private_key_bytes().unwrap());
        assert_eq!(identity.hash(), restored.hash());
        assert_eq!(identity.hash().as_ref().len(), 16);
    }

    #[test]
    fn public_only_identity_matches_full() {
        let full = Identity::generate();
        let public = Identity::from_public_bytes(&full.public_key_bytes()).unwrap();
        assert_eq!(full.hash(), public.hash());
        assert!(!public.has_private_key());
        assert!(public.private_key_bytes().is_none());
    }

    #[test]
    fn sign_verify_across_serialization() {
        let identity = Identity::generate();
        let signature = identity.sign(b"attested data").unwrap();

        let public = Identity::from_public_bytes(&identity.public_key_bytes()).unwrap();
        assert!(public.verify(b"attested data", &signature).is_ok());
        assert!(public.verify(b"other data", &signature).is_err());
        assert!(matches!(
            public.sign(b"cannot sign"),
            Err(IdentityError::NoPrivateKey)
        ));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let recipient = Identity::generate();
        let public = Identity::from_public_bytes(&recipient.public_key_bytes()).unwrap();

        let plaintext = b"envelope encryption roundtrip";
        let ciphertext = public.encrypt(plaintext);
        assert!(ciphertext.len() >= 32 + TOKEN_OVERHEAD);

        let decrypted = recipient.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_fails_for_wrong_identity() {
        let recipient = Identity::generate();
        let other = Identity::generate();
        let ciphertext = recipient.encrypt(b"not for you");
        assert!(other.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn decrypt_rejects_short_ciphertext() {
        let identity = Identity::generate();
        assert!(matches!(
            identity.decrypt(&[0u8; 40]),
            Err(IdentityError::PayloadTooShort { .. })
        ));
    }

    #[test]
    fn ratchet_key_isolates_long_term_key() {
        let recipient = Identity::generate();
        let ratchet = X25519PrivateKey::generate();

        let ciphertext = recipient.encrypt_to_key(b"ratcheted", &ratchet.public_key());

        // Long-term private key cannot decrypt what was keyed to the ratchet.
        assert!(recipient.decrypt(&ciphertext).is_err());
        let decrypted = recipient.decrypt_with_key(&ciphertext, &ratchet).unwrap();
        assert_eq!(decrypted, b"ratcheted");
    }
}
