//! Core types, constants, and wire formats for the rns network stack.
//!
//! Addressing, identity, the packet codec, announces, and the framing codecs
//! used by serial-like transports. Everything here is pure: no I/O, no time
//! sampling, no global state.

pub mod announce;
pub mod constants;
pub mod destination;
pub mod error;
pub mod framing;
pub mod group;
pub mod identity;
pub mod packet;
pub mod ratchet;
pub mod types;

pub use announce::Announce;
pub use constants::{DestinationType, HeaderType, PacketType, TransportType};
pub use destination::Destination;
pub use error::{AnnounceError, FramingError, IdentityError, PacketError};
pub use group::GroupKey;
pub use identity::Identity;
pub use packet::context::ContextType;
pub use packet::flags::PacketFlags;
pub use packet::wire::RawPacket;
pub use ratchet::RatchetStore;
pub use types::{
    DestinationHash, IdentityHash, InvalidLength, LinkId, NameHash, PacketHash, TruncatedHash,
};
