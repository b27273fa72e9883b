//! Announce construction and validation.
//!
//! An announce is a signed advertisement of a destination. Routers re-flood
//! validated announces to build their path tables.
//!
//! # Payload layout
//!
//! ```text
//! public_key(64) || name_hash(10) || random_hash(10) [|| ratchet(32)] || signature(64) [|| app_data]
//! ```
//!
//! The ratchet key is present iff the packet's context flag is set.
//!
//! # Signed data
//!
//! ```text
//! destination_hash(16) || public_key(64) || name_hash(10) || random_hash(10) [|| ratchet(32)] [|| app_data]
//! ```

use rns_crypto::ed25519::{Ed25519PublicKey, Ed25519Signature};
use rns_crypto::sha::truncated_hash;

use crate::constants::{
    ANNOUNCE_MIN_PAYLOAD, DestinationType, HeaderType, KEYSIZE, NAME_HASH_LENGTH, PacketType,
    RANDOM_HASH_LENGTH, RATCHETSIZE, SIGLENGTH, TransportType,
};
use crate::destination;
use crate::error::AnnounceError;
use crate::identity::Identity;
use crate::packet::context::ContextType;
use crate::packet::flags::PacketFlags;
use crate::packet::wire::RawPacket;
use crate::types::{DestinationHash, IdentityHash, NameHash};

/// A parsed or locally constructed announce.
#[derive(Debug, Clone)]
pub struct Announce {
    pub destination_hash: DestinationHash,
    pub public_key: [u8; 64],
    pub name_hash: NameHash,
    pub random_hash: [u8; 10],
    pub ratchet: Option<[u8; 32]>,
    pub signature: [u8; 64],
    pub app_data: Option<Vec<u8>>,
}

/// Build a 10-byte random hash: 5 random bytes followed by the low 5 bytes
/// of the big-endian Unix timestamp. The embedded timestamp orders announces
/// from the same destination.
pub fn make_random_hash(now_unix: u64) -> [u8; 10] {
    use rand::RngCore;
    let mut result = [0u8; 10];
    rand::rngs::OsRng.fill_bytes(&mut result[..5]);
    result[5..10].copy_from_slice(&now_unix.to_be_bytes()[3..8]);
    result
}

/// Recover the emission timestamp embedded in a random hash.
#[must_use]
pub fn emitted_timestamp(random_hash: &[u8; 10]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[3..8].copy_from_slice(&random_hash[5..10]);
    u64::from_be_bytes(bytes)
}

impl Announce {
    /// Create a new signed announce. The identity must hold private keys.
    pub fn create(
        identity: &Identity,
        name_hash: NameHash,
        destination_hash: DestinationHash,
        random_hash: [u8; 10],
        ratchet: Option<[u8; 32]>,
        app_data: Option<&[u8]>,
    ) -> Result<Self, AnnounceError> {
        let mut announce = Announce {
            destination_hash,
            public_key: identity.public_key_bytes(),
            name_hash,
            random_hash,
            ratchet,
            signature: [0u8; 64],
            app_data: app_data.map(|d| d.to_vec()),
        };

        let signed_data = announce.signed_data();
        let sig = identity.sign(&signed_data)?;
        announce.signature = sig.to_bytes();

        Ok(announce)
    }

    /// Parse an announce from a packet payload. `context_flag` signals the
    /// presence of a ratchet key; `destination_hash` comes from the header.
    pub fn from_payload(
        destination_hash: DestinationHash,
        context_flag: bool,
        payload: &[u8],
    ) -> Result<Self, AnnounceError> {
        let min_len = if context_flag {
            ANNOUNCE_MIN_PAYLOAD + RATCHETSIZE
        } else {
            ANNOUNCE_MIN_PAYLOAD
        };

        if payload.len() < min_len {
            return Err(AnnounceError::PayloadTooShort {
                min: min_len,
                actual: payload.len(),
            });
        }

        let mut cursor = payload;

        let (chunk, rest) = cursor.split_at(KEYSIZE);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(chunk);
        cursor = rest;

        let (chunk, rest) = cursor.split_at(NAME_HASH_LENGTH);
        let mut name_hash_bytes = [0u8; 10];
        name_hash_bytes.copy_from_slice(chunk);
        cursor = rest;

        let (chunk, rest) = cursor.split_at(RANDOM_HASH_LENGTH);
        let mut random_hash = [0u8; 10];
        random_hash.copy_from_slice(chunk);
        cursor = rest;

        let ratchet = if context_flag {
            let (chunk, rest) = cursor.split_at(RATCHETSIZE);
            let mut ratchet_key = [0u8; 32];
            ratchet_key.copy_from_slice(chunk);
            cursor = rest;
            Some(ratchet_key)
        } else {
            None
        };

        let (chunk, rest) = cursor.split_at(SIGLENGTH);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(chunk);
        cursor = rest;

        let app_data = if !cursor.is_empty() {
            Some(cursor.to_vec())
        } else {
            None
        };

        Ok(Announce {
            destination_hash,
            public_key,
            name_hash: NameHash::new(name_hash_bytes),
            random_hash,
            ratchet,
            signature,
            app_data,
        })
    }

    /// Parse an announce from a complete raw packet.
    pub fn from_raw_packet(packet: &RawPacket) -> Result<Self, AnnounceError> {
        if packet.flags.packet_type != PacketType::Announce {
            return Err(AnnounceError::NotAnAnnounce);
        }
        Self::from_payload(packet.destination, packet.flags.context_flag, &packet.data)
    }

    /// The byte string covered by the announce signature.
    #[must_use]
    pub fn signed_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            16 + KEYSIZE
                + NAME_HASH_LENGTH
                + RANDOM_HASH_LENGTH
                + self.ratchet.map_or(0, |_| RATCHETSIZE)
                + self.app_data.as_ref().map_or(0, Vec::len),
        );
        data.extend_from_slice(self.destination_hash.as_ref());
        data.extend_from_slice(&self.public_key);
        data.extend_from_slice(self.name_hash.as_ref());
        data.extend_from_slice(&self.random_hash);
        if let Some(ref ratchet) = self.ratchet {
            data.extend_from_slice(ratchet);
        }
        if let Some(ref app_data) = self.app_data {
            data.extend_from_slice(app_data);
        }
        data
    }

    /// Serialize the announce payload (everything after the packet header).
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            KEYSIZE
                + NAME_HASH_LENGTH
                + RANDOM_HASH_LENGTH
                + self.ratchet.map_or(0, |_| RATCHETSIZE)
                + SIGLENGTH
                + self.app_data.as_ref().map_or(0, Vec::len),
        );
        data.extend_from_slice(&self.public_key);
        data.extend_from_slice(self.name_hash.as_ref());
        data.extend_from_slice(&self.random_hash);
        if let Some(ref ratchet) = self.ratchet {
            data.extend_from_slice(ratchet);
        }
        data.extend_from_slice(&self.signature);
        if let Some(ref app_data) = self.app_data {
            data.extend_from_slice(app_data);
        }
        data
    }

    /// Wrap the announce in a direct-header packet with hop count zero.
    pub fn to_raw_packet(&self) -> RawPacket {
        RawPacket {
            flags: PacketFlags {
                ifac_flag: false,
                header_type: HeaderType::Header1,
                context_flag: self.ratchet.is_some(),
                transport_type: TransportType::Broadcast,
                destination_type: DestinationType::Single,
                packet_type: PacketType::Announce,
            },
            hops: 0,
            transport_id: None,
            destination: self.destination_hash,
            context: ContextType::None,
            data: self.payload(),
        }
    }

    /// The identity hash claimed by the announced public key.
    #[must_use]
    pub fn identity_hash(&self) -> IdentityHash {
        IdentityHash::new(truncated_hash(&self.public_key))
    }

    /// Validate the announce: the destination hash must bind to the claimed
    /// identity and name, and the signature must verify under the announced
    /// Ed25519 key.
    ///
    /// Returns the validated identity hash.
    pub fn validate(&self) -> Result<IdentityHash, AnnounceError> {
        let identity_hash = self.identity_hash();
        let expected = destination::destination_hash(&self.name_hash, &identity_hash);
        if expected != self.destination_hash {
            return Err(AnnounceError::HashMismatch);
        }

        let ed25519_bytes: [u8; 32] = self.public_key[32..]
            .try_into()
            .expect("slice is exactly 32 bytes");
        let verifying_key = Ed25519PublicKey::from_bytes(ed25519_bytes)
            .map_err(|_| AnnounceError::InvalidSignature)?;
        let signature = Ed25519Signature::from_bytes(self.signature);
        verifying_key
            .verify(&self.signed_data(), &signature)
            .map_err(|_| AnnounceError::InvalidSignature)?;

        Ok(identity_hash)
    }

    /// The emission timestamp embedded in the random hash.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        emitted_timestamp(&self.random_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;

    fn make_announce(ratchet: Option<[u8; 32]>, app_data: Option<&[u8]>) -> (Identity, Announce) {
        let identity = Identity::generate();
        let dest = Destination::single(*identity.hash(), "chat", &["alpha"]);
        let announce = Announce::create(
            &identity,
            *dest.name_hash(),
            *dest.hash(),
            make_random_hash(1_700_000_000),
            ratchet,
            app_data,
        )
        .unwrap();
        (identity, announce)
    }

    #[test]
    fn created_announce_validates() {
        let (identity, announce) = make_announce(None, None);
        let identity_hash = announce.validate().unwrap();
        assert_eq!(&identity_hash, identity.hash());
    }

    #[test]
    fn payload_roundtrip_without_ratchet() {
        let (_, announce) = make_announce(None, Some(b"node-1"));
        let payload = announce.payload();
        let parsed = Announce::from_payload(announce.destination_hash, false, &payload).unwrap();
        assert_eq!(parsed.public_key, announce.public_key);
        assert_eq!(parsed.name_hash, announce.name_hash);
        assert_eq!(parsed.random_hash, announce.random_hash);
        assert_eq!(parsed.signature, announce.signature);
        assert_eq!(parsed.app_data.as_deref(), Some(&b"node-1"[..]));
        assert!(parsed.ratchet.is_none());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn payload_roundtrip_with_ratchet() {
        let (_, announce) = make_announce(Some([0x5Au8; 32]), None);
        let payload = announce.payload();
        let parsed = Announce::from_payload(announce.destination_hash, true, &payload).unwrap();
        assert_eq!(parsed.ratchet, Some([0x5Au8; 32]));
        assert!(parsed.app_data.is_none());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn packet_roundtrip_sets_context_flag() {
        let (_, announce) = make_announce(Some([0x11u8; 32]), Some(b"x"));
        let packet = announce.to_raw_packet();
        assert!(packet.flags.context_flag);

        let wire = packet.serialize();
        let reparsed = RawPacket::parse(&wire).unwrap();
        let recovered = Announce::from_raw_packet(&reparsed).unwrap();
        assert!(recovered.validate().is_ok());
        assert_eq!(recovered.ratchet, announce.ratchet);
    }

    #[test]
    fn tampered_app_data_fails_signature() {
        let (_, announce) = make_announce(None, Some(b"legit"));
        let mut payload = announce.payload();
        let len = payload.len();
        payload[len - 1] ^= 0xFF;
        let parsed = Announce::from_payload(announce.destination_hash, false, &payload).unwrap();
        assert!(matches!(
            parsed.validate(),
            Err(AnnounceError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_destination_hash_fails_binding() {
        let (_, announce) = make_announce(None, None);
        let payload = announce.payload();
        let parsed =
            Announce::from_payload(DestinationHash::new([0xEE; 16]), false, &payload).unwrap();
        assert!(matches!(parsed.validate(), Err(AnnounceError::HashMismatch)));
    }

    #[test]
    fn substituted_key_fails_binding() {
        // Re-signing with a different identity keeps the signature valid but
        // breaks the destination hash binding.
        let (_, announce) = make_announce(None, None);
        let other = Identity::generate();
        let mut forged = announce.clone();
        forged.public_key = other.public_key_bytes();
        let sig = other.sign(&forged.signed_data()).unwrap();
        forged.signature = sig.to_bytes();
        assert!(matches!(forged.validate(), Err(AnnounceError::HashMismatch)));
    }

    #[test]
    fn short_payload_rejected() {
        let result = Announce::from_payload(DestinationHash::new([0u8; 16]), false, &[0u8; 147]);
        assert!(matches!(
            result,
            Err(AnnounceError::PayloadTooShort { min: 148, .. })
        ));

        // With a ratchet flagged, the minimum grows by the ratchet size.
        let result = Announce::from_payload(DestinationHash::new([0u8; 16]), true, &[0u8; 179]);
        assert!(matches!(
            result,
            Err(AnnounceError::PayloadTooShort { min: 180, .. })
        ));
    }

    #[test]
    fn emitted_timestamp_roundtrip() {
        let rh = make_random_hash(1_700_000_123);
        assert_eq!(emitted_timestamp(&rh), 1_700_000_123);
    }
}
