//! Pure path-replacement decision for inbound announces.
//!
//! Extracted from the announce processing flow so the replacement policy is
//! testable without an engine.

use rns_core::announce::emitted_timestamp;
use rns_core::types::{DestinationHash, TruncatedHash};

use crate::path::PathEntry;

/// Outcome of evaluating an announce against the path table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDecision {
    /// No entry exists; insert a fresh one.
    InsertNew,
    /// Replace the existing entry with the announced path.
    Replace,
    /// Keep the existing entry; only record the announce's random blob.
    TrackBlob,
    /// Exact duplicate announce (same random blob); nothing to do.
    Skip,
}

/// Decide whether an inbound announce updates the path table.
///
/// The policy, in order:
/// 1. no entry → insert;
/// 2. same random blob → skip;
/// 3. strictly fewer hops, or an expired or downed-interface entry → replace;
/// 4. equal-or-fewer hops with a strictly newer emission timestamp → replace;
/// 5. otherwise keep the old path and track the blob.
///
/// Equal hop count from a different interface never replaces by itself.
#[must_use]
pub fn decide_path_update(
    existing: Option<&PathEntry>,
    hops: u8,
    random_hash: &[u8; 10],
    now: f64,
    interface_up: bool,
) -> PathDecision {
    let Some(entry) = existing else {
        return PathDecision::InsertNew;
    };

    if entry.has_random_blob(random_hash) {
        return PathDecision::Skip;
    }

    if hops < entry.hops || entry.is_expired(now) || !interface_up {
        return PathDecision::Replace;
    }

    if hops <= entry.hops && emitted_timestamp(random_hash) > entry.latest_emission() {
        return PathDecision::Replace;
    }

    PathDecision::TrackBlob
}

/// The next-hop field for a path learned from an announce: the forwarding
/// node's transport id, or all zeros when the announce arrived directly.
#[must_use]
pub fn announce_next_hop(
    transport_id: Option<&TruncatedHash>,
    _destination: &DestinationHash,
) -> TruncatedHash {
    transport_id
        .copied()
        .unwrap_or_else(|| TruncatedHash::new([0u8; 16]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::{InterfaceId, InterfaceMode};
    use rns_core::types::PacketHash;

    fn blob(seed: u8, emitted: u64) -> [u8; 10] {
        let mut b = [seed; 10];
        b[5..10].copy_from_slice(&emitted.to_be_bytes()[3..8]);
        b
    }

    fn entry(hops: u8, timestamp: f64, blob: [u8; 10]) -> PathEntry {
        PathEntry::new(
            timestamp,
            TruncatedHash::new([0u8; 16]),
            hops,
            InterfaceMode::Full,
            blob,
            InterfaceId(1),
            PacketHash::new([0u8; 32]),
            Vec::new(),
        )
    }

    #[test]
    fn no_entry_inserts() {
        assert_eq!(
            decide_path_update(None, 3, &blob(1, 100), 1000.0, true),
            PathDecision::InsertNew
        );
    }

    #[test]
    fn duplicate_blob_skips() {
        let e = entry(3, 1000.0, blob(1, 100));
        assert_eq!(
            decide_path_update(Some(&e), 3, &blob(1, 100), 1001.0, true),
            PathDecision::Skip
        );
    }

    #[test]
    fn fewer_hops_replaces() {
        let e = entry(5, 1000.0, blob(1, 100));
        assert_eq!(
            decide_path_update(Some(&e), 2, &blob(2, 50), 1001.0, true),
            PathDecision::Replace
        );
    }

    #[test]
    fn equal_hops_older_emission_keeps_existing() {
        let e = entry(3, 1000.0, blob(1, 100));
        assert_eq!(
            decide_path_update(Some(&e), 3, &blob(2, 50), 1001.0, true),
            PathDecision::TrackBlob
        );
    }

    #[test]
    fn equal_hops_newer_emission_replaces() {
        let e = entry(3, 1000.0, blob(1, 100));
        assert_eq!(
            decide_path_update(Some(&e), 3, &blob(2, 200), 1001.0, true),
            PathDecision::Replace
        );
    }

    #[test]
    fn more_hops_tracks_blob() {
        let e = entry(2, 1000.0, blob(1, 100));
        assert_eq!(
            decide_path_update(Some(&e), 5, &blob(2, 200), 1001.0, true),
            PathDecision::TrackBlob
        );
    }

    #[test]
    fn expired_entry_replaces_even_with_worse_hops() {
        let e = entry(2, 0.0, blob(1, 100));
        let after_expiry = InterfaceMode::Full.path_ttl() + 1.0;
        assert_eq!(
            decide_path_update(Some(&e), 7, &blob(2, 50), after_expiry, true),
            PathDecision::Replace
        );
    }

    #[test]
    fn downed_interface_replaces() {
        let e = entry(2, 1000.0, blob(1, 100));
        assert_eq!(
            decide_path_update(Some(&e), 7, &blob(2, 50), 1001.0, false),
            PathDecision::Replace
        );
    }

    #[test]
    fn next_hop_uses_transport_id_or_zeros() {
        let dest = DestinationHash::new([1u8; 16]);
        let tid = TruncatedHash::new([9u8; 16]);
        assert_eq!(announce_next_hop(Some(&tid), &dest), tid);
        assert_eq!(
            announce_next_hop(None, &dest),
            TruncatedHash::new([0u8; 16])
        );
    }
}
