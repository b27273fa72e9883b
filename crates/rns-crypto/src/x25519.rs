//! X25519 Diffie-Hellman key exchange.
//!
//! Newtypes over the `x25519-dalek` primitives, used for identity key
//! exchange, ratchet keys, and ephemeral link establishment.

use x25519_dalek::{PublicKey, StaticSecret};

/// An X25519 private key (Curve25519 scalar).
pub struct X25519PrivateKey(StaticSecret);

impl X25519PrivateKey {
    /// Generate a random X25519 private key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::rngs::OsRng))
    }

    /// Create an X25519 private key from raw bytes.
    ///
    /// Curve25519 clamping is applied by the underlying library when the key
    /// is used, so the bytes are stored as-is.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the corresponding public key.
    #[must_use]
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(PublicKey::from(&self.0))
    }

    /// Perform the Diffie-Hellman exchange with another party's public key,
    /// returning the 32-byte shared secret.
    #[must_use]
    pub fn diffie_hellman(&self, their_public: &X25519PublicKey) -> [u8; 32] {
        *self.0.diffie_hellman(&their_public.0).as_bytes()
    }

    /// Extract the raw 32-byte private key material.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

/// An X25519 public key (Curve25519 group element).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X25519PublicKey(PublicKey);

impl X25519PublicKey {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        *self.0.as_bytes()
    }
}

impl From<[u8; 32]> for X25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl AsRef<[u8]> for X25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_secret_agreement() {
        let a = X25519PrivateKey::generate();
        let b = X25519PrivateKey::generate();
        let shared_a = a.diffie_hellman(&b.public_key());
        let shared_b = b.diffie_hellman(&a.public_key());
        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn different_peers_different_secrets() {
        let a = X25519PrivateKey::generate();
        let b = X25519PrivateKey::generate();
        let c = X25519PrivateKey::generate();
        assert_ne!(
            a.diffie_hellman(&b.public_key()),
            a.diffie_hellman(&c.public_key())
        );
    }

    #[test]
    fn key_bytes_roundtrip() {
        let key = X25519PrivateKey::generate();
        let restored = X25519PrivateKey::from_bytes(key.to_bytes());
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn rfc7748_base_point_multiplication() {
        // RFC 7748 section 6.1: Alice's private/public test pair.
        let private: [u8; 32] =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap()
                .try_into()
                .unwrap();
        let expected_public =
            hex::decode("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
                .unwrap();
        let derived = X25519PrivateKey::from_bytes(private).public_key();
        assert_eq!(derived.to_bytes().as_slice(), expected_public.as_slice());
    }
}
