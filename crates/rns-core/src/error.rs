//! Error types for the rns-core crate.

use rns_crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("packet too short: need at least {min} bytes, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("packet too large: {actual} bytes exceeds MTU of {mtu}")]
    TooLarge { actual: usize, mtu: usize },

    #[error("invalid header type: {0}")]
    InvalidHeaderType(u8),

    #[error("invalid transport type: {0}")]
    InvalidTransportType(u8),

    #[error("invalid destination type: {0}")]
    InvalidDestinationType(u8),

    #[error("invalid packet type: {0}")]
    InvalidPacketType(u8),

    #[error("invalid context type: {0}")]
    InvalidContextType(u8),
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no private key available")]
    NoPrivateKey,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("payload too short: need at least {min} bytes, got {actual}")]
    PayloadTooShort { min: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("announce payload too short: need at least {min} bytes, got {actual}")]
    PayloadTooShort { min: usize, actual: usize },

    #[error("announce signature is invalid")]
    InvalidSignature,

    #[error("destination hash does not match announced identity")]
    HashMismatch,

    #[error("packet is not an announce")]
    NotAnAnnounce,

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
}

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("missing frame delimiter")]
    MissingDelimiter,

    #[error("incomplete escape sequence")]
    IncompleteEscape,
}
