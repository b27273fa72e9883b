//! Actions emitted by the transport engine, and the drop/stat accounting.
//!
//! The engine computes; the host performs. Every input call returns an
//! ordered batch of actions the host must apply in order.

use rns_core::types::{DestinationHash, PacketHash};

use crate::iface::InterfaceId;

/// Why a frame was dropped instead of processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Header too short, frame over MTU, reserved bits set, bad enums.
    MalformedPacket,
    /// Announce signature did not verify.
    SignatureInvalid,
    /// Announce destination hash did not bind to the announced identity.
    HashMismatch,
    /// Dedup hit.
    Replay,
    /// Rate budget exceeded and the packet type does not queue.
    RateLimited,
    /// Forwarding requested but no route is known.
    NoPath,
    /// Hop count exceeded the maximum.
    HopLimitExceeded,
    /// Not addressed to a local destination and this node does not route.
    UnknownDestination,
}

/// An instruction from the engine to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAction {
    /// Transmit raw bytes on a specific interface.
    SendOnInterface { interface: InterfaceId, raw: Vec<u8> },
    /// Hand a packet to the locally registered destination.
    DeliverLocal {
        destination: DestinationHash,
        raw: Vec<u8>,
        packet_hash: PacketHash,
    },
    /// The path table changed for a destination.
    PathUpdated {
        destination: DestinationHash,
        hops: u8,
    },
    /// A frame was discarded.
    Drop { reason: DropReason },
}

/// Counters for protocol-level events that are never surfaced as errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub malformed: u64,
    pub signature_invalid: u64,
    pub hash_mismatch: u64,
    pub replays: u64,
    pub rate_limited: u64,
    pub no_path: u64,
    pub hop_limit_exceeded: u64,
    pub unknown_destination: u64,
    pub delivered: u64,
    pub forwarded: u64,
    pub announces_processed: u64,
    pub announces_forwarded: u64,
    pub announces_queued: u64,
}

impl TransportStats {
    /// Record a drop under its reason counter.
    pub fn count_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MalformedPacket => self.malformed += 1,
            DropReason::SignatureInvalid => self.signature_invalid += 1,
            DropReason::HashMismatch => self.hash_mismatch += 1,
            DropReason::Replay => self.replays += 1,
            DropReason::RateLimited => self.rate_limited += 1,
            DropReason::NoPath => self.no_path += 1,
            DropReason::HopLimitExceeded => self.hop_limit_exceeded += 1,
            DropReason::UnknownDestination => self.unknown_destination += 1,
        }
    }
}
