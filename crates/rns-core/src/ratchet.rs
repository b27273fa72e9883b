//! Rotating X25519 ratchet keys for forward secrecy.
//!
//! A destination that enables ratchets advertises a short-lived X25519 key
//! in its announces. Peers key new sessions to the advertised ratchet
//! instead of the long-term identity key, so a later long-term key
//! compromise does not expose past traffic. Rotated-out keys are retained
//! for a bounded window to serve requests that raced a rotation.

use rns_crypto::sha::truncated_hash;
use rns_crypto::x25519::{X25519PrivateKey, X25519PublicKey};

use crate::types::TruncatedHash;

/// Default rotation interval in seconds (30 minutes).
pub const DEFAULT_ROTATION_INTERVAL: f64 = 1800.0;

/// Default retention window for rotated-out keys in seconds (14 days).
pub const DEFAULT_RETENTION: f64 = 60.0 * 60.0 * 24.0 * 14.0;

/// Hard cap on retained keys, whatever the retention window says.
pub const MAX_RETAINED: usize = 128;

/// The 16-byte identifier of a ratchet key: `SHA-256(public_key)[:16]`.
pub fn ratchet_id(public: &X25519PublicKey) -> TruncatedHash {
    TruncatedHash::new(truncated_hash(&public.to_bytes()))
}

struct RetiredRatchet {
    key: X25519PrivateKey,
    id: TruncatedHash,
    retired_at: f64,
}

/// A destination's rotating ratchet key store.
#[must_use]
pub struct RatchetStore {
    current: X25519PrivateKey,
    current_id: TruncatedHash,
    rotated_at: f64,
    retired: Vec<RetiredRatchet>,
    rotation_interval: f64,
    retention: f64,
}

impl RatchetStore {
    /// Create a store with a fresh current key and default cadence.
    pub fn new(now: f64) -> Self {
        Self::with_cadence(now, DEFAULT_ROTATION_INTERVAL, DEFAULT_RETENTION)
    }

    /// Create a store with an explicit rotation interval and retention window.
    pub fn with_cadence(now: f64, rotation_interval: f64, retention: f64) -> Self {
        let current = X25519PrivateKey::generate();
        let current_id = ratchet_id(&current.public_key());
        Self {
            current,
            current_id,
            rotated_at: now,
            retired: Vec::new(),
            rotation_interval,
            retention,
        }
    }

    /// The currently advertised ratchet public key.
    pub fn current_public(&self) -> X25519PublicKey {
        self.current.public_key()
    }

    /// The id of the currently advertised ratchet key.
    pub fn current_id(&self) -> TruncatedHash {
        self.current_id
    }

    /// Whether the rotation interval has elapsed.
    #[must_use]
    pub fn should_rotate(&self, now: f64) -> bool {
        now - self.rotated_at >= self.rotation_interval
    }

    /// Retire the current key and generate a fresh one.
    pub fn rotate(&mut self, now: f64) {
        let next = X25519PrivateKey::generate();
        let next_id = ratchet_id(&next.public_key());
        let old = std::mem::replace(&mut self.current, next);
        let old_id = std::mem::replace(&mut self.current_id, next_id);
        self.retired.push(RetiredRatchet {
            key: old,
            id: old_id,
            retired_at: now,
        });
        self.rotated_at = now;
        self.cull(now);
    }

    /// Drop retired keys past the retention window or count cap.
    pub fn cull(&mut self, now: f64) {
        let retention = self.retention;
        self.retired.retain(|r| now - r.retired_at < retention);
        if self.retired.len() > MAX_RETAINED {
            let excess = self.retired.len() - MAX_RETAINED;
            self.retired.drain(..excess);
        }
    }

    /// Resolve a ratchet id to its private key: the current key or any
    /// still-retained retired key.
    #[must_use]
    pub fn private_for_id(&self, id: &TruncatedHash) -> Option<&X25519PrivateKey> {
        if *id == self.current_id {
            return Some(&self.current);
        }
        self.retired.iter().rev().find(|r| r.id == *id).map(|r| &r.key)
    }

    /// Number of retained (retired, still-served) keys.
    #[must_use]
    pub fn retained_len(&self) -> usize {
        self.retired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_changes_current_key() {
        let mut store = RatchetStore::new(0.0);
        let first = store.current_public();
        let first_id = store.current_id();

        store.rotate(10.0);
        assert_ne!(store.current_public(), first);
        assert_ne!(store.current_id(), first_id);
        assert_eq!(store.retained_len(), 1);
    }

    #[test]
    fn retired_keys_resolve_until_retention_expires() {
        let mut store = RatchetStore::with_cadence(0.0, 100.0, 1000.0);
        let old_id = store.current_id();

        store.rotate(100.0);
        assert!(store.private_for_id(&old_id).is_some());

        // Past the retention window the retired key is culled.
        store.cull(100.0 + 1000.0);
        assert!(store.private_for_id(&old_id).is_none());
    }

    #[test]
    fn should_rotate_follows_interval() {
        let store = RatchetStore::with_cadence(0.0, 300.0, 1000.0);
        assert!(!store.should_rotate(299.0));
        assert!(store.should_rotate(300.0));
    }

    #[test]
    fn unknown_id_does_not_resolve() {
        let store = RatchetStore::new(0.0);
        assert!(store.private_for_id(&TruncatedHash::new([0u8; 16])).is_none());
    }

    #[test]
    fn retained_count_is_capped() {
        let mut store = RatchetStore::with_cadence(0.0, 0.0, f64::INFINITY);
        for i in 0..(MAX_RETAINED + 10) {
            store.rotate(i as f64);
        }
        assert!(store.retained_len() <= MAX_RETAINED);
    }

    #[test]
    fn id_matches_public_key_hash() {
        let store = RatchetStore::new(0.0);
        assert_eq!(store.current_id(), ratchet_id(&store.current_public()));
    }
}
