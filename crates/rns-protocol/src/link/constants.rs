//! Link protocol constants.

/// Size of the ephemeral public key in handshake payloads.
pub const EPHEMERAL_KEYSIZE: usize = 32;

/// Size of the ratchet id optionally appended to a link request.
pub const RATCHET_ID_SIZE: usize = 16;

/// Size of the handshake proof HMAC.
pub const PROOF_HMAC_SIZE: usize = 32;

/// Length of a PROOF payload: `ephemeral_pub(32) || hmac(32)`.
pub const PROOF_PAYLOAD_SIZE: usize = EPHEMERAL_KEYSIZE + PROOF_HMAC_SIZE;

/// Maximum keepalive interval in seconds.
pub const KEEPALIVE_MAX: f64 = 360.0;

/// Minimum keepalive interval in seconds.
pub const KEEPALIVE_MIN: f64 = 5.0;

/// RTT that maps to the maximum keepalive interval.
pub const KEEPALIVE_MAX_RTT: f64 = 1.75;

/// Default keepalive before an RTT measurement exists.
pub const KEEPALIVE_DEFAULT: f64 = KEEPALIVE_MAX;

/// Stale after `keepalive * STALE_FACTOR` of inbound silence.
pub const STALE_FACTOR: f64 = 2.0;

/// Torn down after `keepalive * TEARDOWN_FACTOR` of inbound silence.
pub const TEARDOWN_FACTOR: f64 = 4.0;

/// Per-hop allowance for the handshake to complete, in seconds.
pub const ESTABLISHMENT_TIMEOUT_PER_HOP: f64 = 6.0;

/// Bytes of sequence counter prepended to every in-link plaintext.
pub const SEQ_LEN: usize = 8;

/// Keepalive marker sent by the link initiator.
pub const KEEPALIVE_MARKER: u8 = 0xFF;

/// Keepalive echo sent back by the responder.
pub const KEEPALIVE_ECHO_MARKER: u8 = 0xFE;

/// Usable plaintext bytes per sealed in-link packet.
///
/// `floor((MTU - IFAC_MIN - HEADER_1 - TOKEN_OVERHEAD) / AES_BLOCK) * AES_BLOCK - 1`
/// leaves room for the token's mandatory padding byte, then the sequence
/// counter comes out of what remains.
#[must_use]
pub fn link_mdu(mtu: usize) -> usize {
    use rns_core::constants::{HEADER_1_SIZE, IFAC_MIN_SIZE, TOKEN_OVERHEAD};
    let usable = mtu
        .saturating_sub(IFAC_MIN_SIZE)
        .saturating_sub(HEADER_1_SIZE)
        .saturating_sub(TOKEN_OVERHEAD);
    let blocks = usable / 16;
    (blocks * 16).saturating_sub(1).saturating_sub(SEQ_LEN)
}
