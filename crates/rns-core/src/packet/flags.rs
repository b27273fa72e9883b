//! Packet flag byte encoding and decoding.
//!
//! Flag byte layout:
//! ```text
//! Bit 7: ifac_flag (access code present)
//! Bit 6: header_type (0=HEADER_1, 1=HEADER_2)
//! Bit 5: context_flag
//! Bit 4: transport_type (0=BROADCAST, 1=TRANSPORT)
//! Bits 3-2: destination_type (0=SINGLE, 1=GROUP, 2=PLAIN, 3=LINK)
//! Bits 1-0: packet_type (0=DATA, 1=ANNOUNCE, 2=LINKREQUEST, 3=PROOF)
//! ```

use crate::constants::{DestinationType, HeaderType, PacketType, TransportType};
use crate::error::PacketError;

/// Mask selecting the bits of the flag byte that enter the hashable part:
/// destination type and packet type only. Header type, transport type,
/// context flag and the access-code flag all mutate in transit.
pub const FLAGS_HASHABLE_MASK: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketFlags {
    pub ifac_flag: bool,
    pub header_type: HeaderType,
    pub context_flag: bool,
    pub transport_type: TransportType,
    pub destination_type: DestinationType,
    pub packet_type: PacketType,
}

impl PacketFlags {
    pub fn from_byte(byte: u8) -> Result<Self, PacketError> {
        let ifac_flag = (byte >> 7) & 0x01 != 0;
        let header_type = HeaderType::from_u8((byte >> 6) & 0x01)?;
        let context_flag = (byte >> 5) & 0x01 != 0;
        let transport_type = TransportType::from_u8((byte >> 4) & 0x01)?;
        let destination_type = DestinationType::from_u8((byte >> 2) & 0x03)?;
        let packet_type = PacketType::from_u8(byte & 0x03)?;

        Ok(PacketFlags {
            ifac_flag,
            header_type,
            context_flag,
            transport_type,
            destination_type,
            packet_type,
        })
    }

    #[must_use]
    pub fn to_byte(&self) -> u8 {
        ((self.ifac_flag as u8) << 7)
            | ((self.header_type as u8) << 6)
            | ((self.context_flag as u8) << 5)
            | ((self.transport_type as u8) << 4)
            | ((self.destination_type as u8) << 2)
            | (self.packet_type as u8)
    }
}

impl TryFrom<u8> for PacketFlags {
    type Error = PacketError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte)
    }
}
