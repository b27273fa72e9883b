//! Packet context byte.
//!
//! The context byte multiplexes protocol functions sharing a destination:
//! resource transfer phases, link lifecycle messages, and path responses.

use crate::error::PacketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
#[repr(u8)]
pub enum ContextType {
    None = 0,
    Resource = 1,
    ResourceAdv = 2,
    ResourceReq = 3,
    ResourceHmu = 4,
    ResourcePrf = 5,
    ResourceIcl = 6,
    ResourceRcl = 7,
    CacheRequest = 8,
    Request = 9,
    Response = 10,
    PathResponse = 11,
    Command = 12,
    CommandStatus = 13,
    Channel = 14,
    Keepalive = 250,
    LinkIdentify = 251,
    LinkClose = 252,
    LinkProof = 253,
    Lrrtt = 254,
    Lrproof = 255,
}

impl TryFrom<u8> for ContextType {
    type Error = PacketError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(ContextType::None),
            1 => Ok(ContextType::Resource),
            2 => Ok(ContextType::ResourceAdv),
            3 => Ok(ContextType::ResourceReq),
            4 => Ok(ContextType::ResourceHmu),
            5 => Ok(ContextType::ResourcePrf),
            6 => Ok(ContextType::ResourceIcl),
            7 => Ok(ContextType::ResourceRcl),
            8 => Ok(ContextType::CacheRequest),
            9 => Ok(ContextType::Request),
            10 => Ok(ContextType::Response),
            11 => Ok(ContextType::PathResponse),
            12 => Ok(ContextType::Command),
            13 => Ok(ContextType::CommandStatus),
            14 => Ok(ContextType::Channel),
            250 => Ok(ContextType::Keepalive),
            251 => Ok(ContextType::LinkIdentify),
            252 => Ok(ContextType::LinkClose),
            253 => Ok(ContextType::LinkProof),
            254 => Ok(ContextType::Lrrtt),
            255 => Ok(ContextType::Lrproof),
            _ => Err(PacketError::InvalidContextType(byte)),
        }
    }
}

impl ContextType {
    #[must_use]
    pub const fn to_byte(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_roundtrip() {
        let known: &[u8] = &[
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 250, 251, 252, 253, 254, 255,
        ];
        for &byte in known {
            let ctx = ContextType::try_from(byte).expect("known context value");
            assert_eq!(ctx.to_byte(), byte);
        }
    }

    #[test]
    fn unknown_values_rejected() {
        for byte in [15u8, 100, 200, 249] {
            assert!(ContextType::try_from(byte).is_err());
        }
    }
}
