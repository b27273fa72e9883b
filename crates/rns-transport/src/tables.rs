//! Reverse and pending-link tables for transported traffic.
//!
//! The reverse table routes proofs back toward the node that originated a
//! forwarded packet. The pending-link table remembers forwarded link
//! requests so in-link traffic can be switched without path lookups.

use std::collections::HashMap;

use rns_core::types::{DestinationHash, LinkId, TruncatedHash};

use crate::iface::InterfaceId;

/// Reverse table entry lifetime (8 minutes).
pub const REVERSE_TIMEOUT: f64 = 8.0 * 60.0;

/// An entry routing proofs back to a forwarded packet's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseEntry {
    /// Interface the original packet arrived on.
    pub receiving_interface: InterfaceId,
    /// Interface the packet was forwarded to.
    pub outbound_interface: InterfaceId,
    /// Creation time.
    pub timestamp: f64,
}

impl ReverseEntry {
    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        now > self.timestamp + REVERSE_TIMEOUT
    }
}

/// Reverse table keyed by the truncated packet hash of the forwarded packet.
#[derive(Default)]
pub struct ReverseTable {
    entries: HashMap<TruncatedHash, ReverseEntry>,
}

impl ReverseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: TruncatedHash, entry: ReverseEntry) {
        self.entries.insert(key, entry);
    }

    /// Look up and consume an entry.
    pub fn take(&mut self, key: &TruncatedHash) -> Option<ReverseEntry> {
        self.entries.remove(key)
    }

    pub fn cull(&mut self, now: f64, is_active: impl Fn(InterfaceId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| {
            !e.is_expired(now)
                && is_active(e.receiving_interface)
                && is_active(e.outbound_interface)
        });
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A forwarded link request awaiting its proof.
#[derive(Debug, Clone)]
pub struct PendingLinkEntry {
    pub timestamp: f64,
    /// Next hop toward the link destination.
    pub next_hop: TruncatedHash,
    pub next_hop_interface: InterfaceId,
    /// Interface the request arrived on (the way back to the initiator).
    pub received_interface: InterfaceId,
    pub destination: DestinationHash,
    pub remaining_hops: u8,
    /// Set once the responder's proof has passed through.
    pub validated: bool,
    /// Absolute deadline for the proof to arrive.
    pub proof_deadline: f64,
}

/// Pending-link table keyed by link id.
#[derive(Default)]
pub struct PendingLinkTable {
    entries: HashMap<LinkId, PendingLinkEntry>,
}

impl PendingLinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, link_id: LinkId, entry: PendingLinkEntry) {
        self.entries.insert(link_id, entry);
    }

    #[must_use]
    pub fn get(&self, link_id: &LinkId) -> Option<&PendingLinkEntry> {
        self.entries.get(link_id)
    }

    pub fn get_mut(&mut self, link_id: &LinkId) -> Option<&mut PendingLinkEntry> {
        self.entries.get_mut(link_id)
    }

    pub fn remove(&mut self, link_id: &LinkId) -> Option<PendingLinkEntry> {
        self.entries.remove(link_id)
    }

    #[must_use]
    pub fn contains(&self, link_id: &LinkId) -> bool {
        self.entries.contains_key(link_id)
    }

    /// Drop unvalidated entries past their proof deadline and entries whose
    /// interfaces disappeared. Validated entries persist until their
    /// interfaces go away.
    pub fn cull(&mut self, now: f64, is_active: impl Fn(InterfaceId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| {
            (e.validated || now <= e.proof_deadline)
                && is_active(e.next_hop_interface)
                && is_active(e.received_interface)
        });
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
