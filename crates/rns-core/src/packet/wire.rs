//! Packet wire codec.
//!
//! Parses raw frames into structured packets, serializes them back, and
//! computes the hashable part the packet hash is taken over. The hop count
//! and transport id are excluded from the hashable part so a packet keeps
//! its identity as it is forwarded.

use crate::constants::{HEADER_1_SIZE, HEADER_2_SIZE, HeaderType, MTU, TRUNCATED_HASHLENGTH};
use crate::error::PacketError;
use crate::packet::context::ContextType;
use crate::packet::flags::{FLAGS_HASHABLE_MASK, PacketFlags};
use crate::types::{DestinationHash, PacketHash, TruncatedHash};

/// A parsed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RawPacket {
    pub flags: PacketFlags,
    pub hops: u8,
    pub transport_id: Option<TruncatedHash>,
    pub destination: DestinationHash,
    pub context: ContextType,
    pub data: Vec<u8>,
}

impl RawPacket {
    /// Parse a raw packet from wire bytes.
    ///
    /// Total on its input: any malformed frame yields a [`PacketError`] and
    /// no partial state.
    pub fn parse(raw: &[u8]) -> Result<Self, PacketError> {
        if raw.len() > MTU {
            return Err(PacketError::TooLarge {
                actual: raw.len(),
                mtu: MTU,
            });
        }
        if raw.len() < HEADER_1_SIZE {
            return Err(PacketError::TooShort {
                min: HEADER_1_SIZE,
                actual: raw.len(),
            });
        }

        let flags = PacketFlags::try_from(raw[0])?;
        let hops = raw[1];

        match flags.header_type {
            HeaderType::Header1 => {
                let dest_bytes: [u8; 16] =
                    raw[2..18].try_into().expect("slice is exactly 16 bytes");
                let context = ContextType::try_from(raw[18])?;

                Ok(RawPacket {
                    flags,
                    hops,
                    transport_id: None,
                    destination: DestinationHash::new(dest_bytes),
                    context,
                    data: raw[HEADER_1_SIZE..].to_vec(),
                })
            }
            HeaderType::Header2 => {
                if raw.len() < HEADER_2_SIZE {
                    return Err(PacketError::TooShort {
                        min: HEADER_2_SIZE,
                        actual: raw.len(),
                    });
                }

                let transport_bytes: [u8; 16] =
                    raw[2..18].try_into().expect("slice is exactly 16 bytes");
                let dest_bytes: [u8; 16] =
                    raw[18..34].try_into().expect("slice is exactly 16 bytes");
                let context = ContextType::try_from(raw[34])?;

                Ok(RawPacket {
                    flags,
                    hops,
                    transport_id: Some(TruncatedHash::new(transport_bytes)),
                    destination: DestinationHash::new(dest_bytes),
                    context,
                    data: raw[HEADER_2_SIZE..].to_vec(),
                })
            }
        }
    }

    /// Serialize the packet back to wire bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let header_size = match self.flags.header_type {
            HeaderType::Header1 => HEADER_1_SIZE,
            HeaderType::Header2 => HEADER_2_SIZE,
        };
        let mut result = Vec::with_capacity(header_size + self.data.len());

        result.push(self.flags.to_byte());
        result.push(self.hops);

        if let Some(ref tid) = self.transport_id {
            result.extend_from_slice(tid.as_ref());
        }

        result.extend_from_slice(self.destination.as_ref());
        result.push(self.context.to_byte());
        result.extend_from_slice(&self.data);
        result
    }

    /// The hashable part of the packet:
    /// `(flags & 0x0F) || destination || context || data`.
    ///
    /// Hops and transport id are omitted, and the flag byte is masked down
    /// to its addressing bits, so the hash survives header rewriting.
    #[must_use]
    pub fn hashable_part(&self) -> Vec<u8> {
        let masked_flags = self.flags.to_byte() & FLAGS_HASHABLE_MASK;

        let mut result = Vec::with_capacity(1 + TRUNCATED_HASHLENGTH + 1 + self.data.len());
        result.push(masked_flags);
        result.extend_from_slice(self.destination.as_ref());
        result.push(self.context.to_byte());
        result.extend_from_slice(&self.data);
        result
    }

    /// The full 32-byte SHA-256 packet hash over the hashable part.
    pub fn packet_hash(&self) -> PacketHash {
        PacketHash::new(rns_crypto::sha::sha256(&self.hashable_part()))
    }
}
