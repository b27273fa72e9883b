//! Path table entry.

use std::collections::VecDeque;

use rns_core::types::{PacketHash, TruncatedHash};

use crate::iface::{InterfaceId, InterfaceMode};

/// Maximum announce random blobs remembered per path entry.
pub const MAX_RANDOM_BLOBS: usize = 64;

/// A learned route to a destination.
#[derive(Debug, Clone)]
pub struct PathEntry {
    /// When the path was last updated.
    pub timestamp: f64,
    /// Next hop node (all zeros when the destination is one hop away).
    pub next_hop: TruncatedHash,
    /// Hop count to the destination.
    pub hops: u8,
    /// Absolute expiry time, derived from the learning interface's mode.
    pub expires: f64,
    /// Interface on which the path was learned.
    pub receiving_interface: InterfaceId,
    /// Hash of the announce packet that created or refreshed this entry.
    pub packet_hash: PacketHash,
    /// The raw announce packet, kept to answer path requests.
    pub announce_raw: Vec<u8>,
    /// Random blobs of announces already folded into this entry.
    random_blobs: VecDeque<[u8; 10]>,
}

impl PathEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: f64,
        next_hop: TruncatedHash,
        hops: u8,
        mode: InterfaceMode,
        random_blob: [u8; 10],
        receiving_interface: InterfaceId,
        packet_hash: PacketHash,
        announce_raw: Vec<u8>,
    ) -> Self {
        let mut random_blobs = VecDeque::with_capacity(4);
        random_blobs.push_back(random_blob);
        Self {
            timestamp,
            next_hop,
            hops,
            expires: timestamp + mode.path_ttl(),
            receiving_interface,
            packet_hash,
            announce_raw,
            random_blobs,
        }
    }

    /// Whether this entry is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        now > self.expires
    }

    /// Force immediate expiry.
    pub fn expire(&mut self) {
        self.expires = 0.0;
    }

    /// Whether this exact announce random blob has been seen before.
    #[must_use]
    pub fn has_random_blob(&self, blob: &[u8; 10]) -> bool {
        self.random_blobs.contains(blob)
    }

    /// Record a random blob, evicting the oldest past the cap.
    pub fn track_random_blob(&mut self, blob: [u8; 10]) {
        if self.has_random_blob(&blob) {
            return;
        }
        self.random_blobs.push_back(blob);
        while self.random_blobs.len() > MAX_RANDOM_BLOBS {
            self.random_blobs.pop_front();
        }
    }

    /// The newest emission timestamp among tracked blobs.
    #[must_use]
    pub fn latest_emission(&self) -> u64 {
        self.random_blobs
            .iter()
            .map(rns_core::announce::emitted_timestamp)
            .max()
            .unwrap_or(0)
    }
}
