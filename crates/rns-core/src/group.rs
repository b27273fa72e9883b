//! Pre-shared keys for GROUP destinations.
//!
//! Group traffic is symmetric: every member holds the same 64-byte key and
//! packets are plain encrypted tokens, with no per-peer key agreement.

use rns_crypto::token::Token;

use crate::error::IdentityError;

/// A 64-byte pre-shared group key.
pub struct GroupKey {
    key: [u8; 64],
}

impl GroupKey {
    /// Generate a fresh random group key.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; 64];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Restore a group key from its raw bytes.
    pub fn from_bytes(key: [u8; 64]) -> Self {
        Self { key }
    }

    /// The raw key bytes, for distribution to members.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 64] {
        self.key
    }

    /// Encrypt a payload for the group.
    #[must_use = "returns the ciphertext without side effects"]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Token::new(&self.key).encrypt(plaintext)
    }

    /// Decrypt a group payload.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, IdentityError> {
        Token::new(&self.key)
            .decrypt(ciphertext)
            .map_err(|_| IdentityError::DecryptionFailed)
    }
}
