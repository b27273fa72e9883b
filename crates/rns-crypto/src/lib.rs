//! Cryptographic primitives for the rns network stack.
//!
//! Everything above this crate deals in fixed-width byte strings; this crate
//! provides the hashing, key derivation, symmetric and asymmetric operations
//! those byte strings come from.

use core::fmt;

pub mod aes_cbc;
pub mod ed25519;
pub mod hkdf;
pub mod hmac;
pub mod pkcs7;
pub mod sha;
pub mod token;
pub mod x25519;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    InvalidKeyLength { expected: usize, actual: usize },
    InvalidSignature,
    InvalidPadding,
    DecryptionFailed,
    InvalidHmac,
    InvalidLength { reason: &'static str },
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidKeyLength { expected, actual } => {
                write!(f, "invalid key length: expected {expected}, got {actual}")
            }
            CryptoError::InvalidSignature => write!(f, "invalid signature"),
            CryptoError::InvalidPadding => write!(f, "invalid PKCS7 padding"),
            CryptoError::DecryptionFailed => write!(f, "decryption failed"),
            CryptoError::InvalidHmac => write!(f, "HMAC verification failed"),
            CryptoError::InvalidLength { reason } => write!(f, "invalid length: {reason}"),
        }
    }
}

impl std::error::Error for CryptoError {}
