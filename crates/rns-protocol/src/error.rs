//! Protocol error types.
//!
//! Session-level failures are surfaced exactly once to the session owner;
//! nothing here leaks below into the transport layer.

use rns_core::error::{IdentityError, PacketError};
use rns_crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("link request data too short")]
    RequestDataTooShort,

    #[error("invalid link proof")]
    InvalidProof,

    #[error("proof does not match the handshake ephemeral key")]
    ProofKeyMismatch,

    #[error("unknown ratchet key requested")]
    UnknownRatchet,

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("link is closed")]
    LinkClosed,

    #[error("replayed or reordered in-link sequence number")]
    SequenceReplay,

    #[error("invalid identify payload")]
    InvalidIdentify,

    #[error("invalid RTT payload")]
    InvalidRttFormat,

    #[error("no private key available")]
    NoPrivateKey,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
}

/// Why a resource transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFailure {
    HashMismatch,
    RetriesExhausted,
    LinkClosed,
    Aborted,
    TimedOut,
}

impl std::fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceFailure::HashMismatch => "hash mismatch",
            ResourceFailure::RetriesExhausted => "per-part retries exhausted",
            ResourceFailure::LinkClosed => "link closed",
            ResourceFailure::Aborted => "aborted",
            ResourceFailure::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("invalid advertisement: {0}")]
    InvalidAdvertisement(String),

    #[error("invalid part payload: {0}")]
    InvalidPart(String),

    #[error("invalid acknowledgement payload: {0}")]
    InvalidAck(String),

    #[error("part index {index} out of range (parts: {num_parts})")]
    PartOutOfRange { index: u32, num_parts: u32 },

    #[error("invalid completion proof")]
    InvalidProof,

    #[error("transfer failed: {0}")]
    Failed(ResourceFailure),

    #[error("resource is not complete")]
    Incomplete,

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("link error: {0}")]
    Link(#[from] LinkError),
}
