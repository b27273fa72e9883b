//! Packet deduplication.
//!
//! A time-aware set of recently seen packet hashes. Entries expire after a
//! fixed TTL and the set is LRU-bounded so a flood cannot grow it without
//! limit. Because the packet hash is taken over the hop-zeroed hashable
//! part, dedup is stable however many hops a frame has traversed.

use std::collections::{HashMap, VecDeque};

use rns_core::types::PacketHash;

/// How long a seen hash suppresses replays (24 hours).
pub const DEDUP_TTL: f64 = 60.0 * 60.0 * 24.0;

/// Upper bound on tracked hashes.
pub const DEDUP_MAX_SIZE: usize = 1_000_000;

/// TTL'd, size-bounded replay filter.
pub struct DedupSet {
    entries: HashMap<PacketHash, f64>,
    order: VecDeque<PacketHash>,
    ttl: f64,
    max_size: usize,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::with_limits(DEDUP_TTL, DEDUP_MAX_SIZE)
    }

    pub fn with_limits(ttl: f64, max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            max_size,
        }
    }

    /// Whether `hash` was seen within the TTL.
    #[must_use]
    pub fn contains(&self, hash: &PacketHash, now: f64) -> bool {
        self.entries
            .get(hash)
            .is_some_and(|&seen| now - seen < self.ttl)
    }

    /// Record `hash`. Returns `true` if it was new (not a live duplicate).
    pub fn insert(&mut self, hash: PacketHash, now: f64) -> bool {
        if self.contains(&hash, now) {
            return false;
        }
        // A re-insert after expiry leaves a stale order entry behind; it is
        // skipped when it surfaces during eviction or culling.
        self.entries.insert(hash, now);
        self.order.push_back(hash);
        while self.entries.len() > self.max_size {
            self.evict_oldest();
        }
        true
    }

    /// Remove expired entries. Insertion order approximates time order, so
    /// culling scans from the front until it hits a live entry.
    pub fn cull(&mut self, now: f64) {
        while let Some(front) = self.order.front() {
            match self.entries.get(front) {
                Some(&seen) if now - seen < self.ttl => break,
                _ => {
                    let hash = self.order.pop_front().expect("front exists");
                    // Only remove the map entry if it still refers to this
                    // (possibly re-inserted) hash's expired timestamp.
                    if self.entries.get(&hash).is_some_and(|&s| now - s >= self.ttl) {
                        self.entries.remove(&hash);
                    }
                }
            }
        }
    }

    fn evict_oldest(&mut self) {
        while let Some(hash) = self.order.pop_front() {
            if self.entries.remove(&hash).is_some() {
                return;
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new()
    }
}
