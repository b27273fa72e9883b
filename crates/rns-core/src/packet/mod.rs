//! Packet wire format: flag byte, context byte, and framing codec.

pub mod context;
pub mod flags;
pub mod wire;

pub use context::ContextType;
pub use flags::PacketFlags;
pub use wire::RawPacket;
