//! Path table mapping destination hashes to learned routes.

use std::collections::HashMap;

use rns_core::types::{DestinationHash, TruncatedHash};

use super::types::PathEntry;
use crate::iface::InterfaceId;

/// Hop count reported for unknown destinations.
pub const UNKNOWN_HOPS: u8 = rns_core::constants::MAX_HOPS;

#[must_use]
pub struct PathTable {
    entries: HashMap<DestinationHash, PathEntry>,
}

impl PathTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, dest: &DestinationHash) -> Option<&PathEntry> {
        self.entries.get(dest)
    }

    pub fn get_mut(&mut self, dest: &DestinationHash) -> Option<&mut PathEntry> {
        self.entries.get_mut(dest)
    }

    /// Whether a live (non-expired) path exists.
    #[must_use]
    pub fn has_path(&self, dest: &DestinationHash, now: f64) -> bool {
        self.entries.get(dest).is_some_and(|e| !e.is_expired(now))
    }

    /// Hop count to a destination, or [`UNKNOWN_HOPS`] if unknown.
    #[must_use]
    pub fn hops_to(&self, dest: &DestinationHash, now: f64) -> u8 {
        self.entries
            .get(dest)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.hops)
            .unwrap_or(UNKNOWN_HOPS)
    }

    /// Next-hop node hash for a destination.
    #[must_use]
    pub fn next_hop(&self, dest: &DestinationHash, now: f64) -> Option<TruncatedHash> {
        self.entries
            .get(dest)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.next_hop)
    }

    /// Interface the path was learned on.
    #[must_use]
    pub fn next_hop_interface(&self, dest: &DestinationHash, now: f64) -> Option<InterfaceId> {
        self.entries
            .get(dest)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.receiving_interface)
    }

    pub fn insert(&mut self, dest: DestinationHash, entry: PathEntry) {
        self.entries.insert(dest, entry);
    }

    /// Force-expire a path. Returns whether it existed.
    pub fn expire_path(&mut self, dest: &DestinationHash) -> bool {
        match self.entries.get_mut(dest) {
            Some(entry) => {
                entry.expire();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, dest: &DestinationHash) -> Option<PathEntry> {
        self.entries.remove(dest)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries and entries learned on interfaces that no longer
    /// exist. Returns the number removed.
    pub fn cull(&mut self, now: f64, is_active: impl Fn(InterfaceId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now) && is_active(entry.receiving_interface));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DestinationHash, &PathEntry)> {
        self.entries.iter()
    }
}

impl Default for PathTable {
    fn default() -> Self {
        Self::new()
    }
}
