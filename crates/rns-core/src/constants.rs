//! Protocol constants and wire enumerations.

use crate::error::PacketError;

// Wire format sizes
pub const MTU: usize = 500;
pub const HEADER_1_SIZE: usize = 19;
pub const HEADER_2_SIZE: usize = 35;
pub const HEADER_MINSIZE: usize = HEADER_1_SIZE;
pub const HEADER_MAXSIZE: usize = HEADER_2_SIZE;
pub const PLAIN_MDU: usize = MTU - HEADER_MAXSIZE - IFAC_MIN_SIZE;
pub const ENCRYPTED_MDU: usize = 383;

// Hash and key sizes
pub const TRUNCATED_HASHLENGTH: usize = 16;
pub const HASHLENGTH: usize = 32;
pub const KEYSIZE: usize = 64;
pub const SIGLENGTH: usize = 64;
pub const NAME_HASH_LENGTH: usize = 10;
pub const RANDOM_HASH_LENGTH: usize = 10;
pub const TOKEN_OVERHEAD: usize = 48;
pub const RATCHETSIZE: usize = 32;
pub const IFAC_MIN_SIZE: usize = 1;

// Announce payload: pubkey + name_hash + random_hash + signature
pub const ANNOUNCE_MIN_PAYLOAD: usize = KEYSIZE + NAME_HASH_LENGTH + RANDOM_HASH_LENGTH + SIGLENGTH;

/// Maximum hop count a packet may accumulate before it is dropped.
pub const MAX_HOPS: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeaderType {
    /// Direct: flags + hops + destination + context.
    Header1 = 0,
    /// Transported: a 16-byte transport id precedes the destination.
    Header2 = 1,
}

impl HeaderType {
    pub fn from_u8(v: u8) -> Result<Self, PacketError> {
        match v {
            0 => Ok(HeaderType::Header1),
            1 => Ok(HeaderType::Header2),
            _ => Err(PacketError::InvalidHeaderType(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransportType {
    Broadcast = 0,
    Transport = 1,
}

impl TransportType {
    pub fn from_u8(v: u8) -> Result<Self, PacketError> {
        match v {
            0 => Ok(TransportType::Broadcast),
            1 => Ok(TransportType::Transport),
            _ => Err(PacketError::InvalidTransportType(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DestinationType {
    Single = 0,
    Group = 1,
    Plain = 2,
    Link = 3,
}

impl DestinationType {
    pub fn from_u8(v: u8) -> Result<Self, PacketError> {
        match v {
            0 => Ok(DestinationType::Single),
            1 => Ok(DestinationType::Group),
            2 => Ok(DestinationType::Plain),
            3 => Ok(DestinationType::Link),
            _ => Err(PacketError::InvalidDestinationType(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Data = 0,
    Announce = 1,
    LinkRequest = 2,
    Proof = 3,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Result<Self, PacketError> {
        match v {
            0 => Ok(PacketType::Data),
            1 => Ok(PacketType::Announce),
            2 => Ok(PacketType::LinkRequest),
            3 => Ok(PacketType::Proof),
            _ => Err(PacketError::InvalidPacketType(v)),
        }
    }
}
