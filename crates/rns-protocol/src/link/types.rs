//! Shared link types.

/// Role of a peer in a link handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Initiator,
    Responder,
}

/// Reason a link was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TeardownReason {
    Timeout = 0x01,
    InitiatorClosed = 0x02,
    DestinationClosed = 0x03,
    HandshakeTimeout = 0x04,
}

impl TeardownReason {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Timeout),
            0x02 => Some(Self::InitiatorClosed),
            0x03 => Some(Self::DestinationClosed),
            0x04 => Some(Self::HandshakeTimeout),
            _ => None,
        }
    }
}

/// Traffic counters for a link.
#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    /// In-link packets rejected by the sequence replay guard.
    pub replays_rejected: u64,
}

/// A 64-byte session key split into signing (first 32) and encryption
/// (last 32) halves, the same split the token construction uses.
#[must_use]
pub struct DerivedKey {
    signing: [u8; 32],
    encryption: [u8; 32],
}

impl DerivedKey {
    pub fn new(bytes: [u8; 64]) -> Self {
        let mut signing = [0u8; 32];
        let mut encryption = [0u8; 32];
        signing.copy_from_slice(&bytes[..32]);
        encryption.copy_from_slice(&bytes[32..]);
        Self {
            signing,
            encryption,
        }
    }

    /// Reconstruct the full 64-byte key.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.signing);
        out[32..].copy_from_slice(&self.encryption);
        out
    }

    /// First 32 bytes: HMAC signing key.
    #[must_use]
    pub const fn signing_key(&self) -> &[u8; 32] {
        &self.signing
    }

    /// Last 32 bytes: AES-256 encryption key.
    #[must_use]
    pub const fn encryption_key(&self) -> &[u8; 32] {
        &self.encryption
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_key_split_and_rebuild() {
        let mut bytes = [0u8; 64];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let key = DerivedKey::new(bytes);
        assert_eq!(&key.signing_key()[..4], &[0, 1, 2, 3]);
        assert_eq!(&key.encryption_key()[..4], &[32, 33, 34, 35]);
        assert_eq!(key.to_bytes(), bytes);
    }

    #[test]
    fn teardown_reason_roundtrip() {
        for v in [0x01u8, 0x02, 0x03, 0x04] {
            assert_eq!(TeardownReason::from_u8(v).unwrap() as u8, v);
        }
        assert!(TeardownReason::from_u8(0x05).is_none());
    }
}
