//! Per-interface announce bandwidth budget and overflow queue.
//!
//! Re-flooded announces on any interface may consume at most
//! [`ANNOUNCE_CAP`] of its nominal bandwidth, measured over a sliding
//! window. Announces that do not fit are queued, ordered by (hops, arrival),
//! and flushed as budget accrues; stale queue entries age out.

use std::collections::VecDeque;

use rns_core::types::DestinationHash;

/// Fraction of an interface's nominal bandwidth available to announces.
pub const ANNOUNCE_CAP: f64 = 0.02;

/// Sliding window the cap is measured over, in seconds.
pub const BUDGET_WINDOW: f64 = 60.0;

/// Queued announces older than this are dropped (24 hours).
pub const QUEUE_MAX_AGE: f64 = 60.0 * 60.0 * 24.0;

/// Upper bound on queued announces per interface.
pub const QUEUE_MAX_LEN: usize = 1024;

/// Window the forwarded-bytes budget may burst over, in seconds.
pub const FORWARD_BURST_WINDOW: f64 = 0.5;

/// Token bucket metering bytes against a fraction of interface bandwidth.
///
/// Tokens accrue at the configured rate and cap at one full window's worth,
/// so a burst after idle time cannot exceed the windowed budget.
#[derive(Debug, Clone)]
pub struct ByteBudget {
    rate: f64,
    capacity: f64,
    tokens: f64,
    updated: f64,
}

impl ByteBudget {
    /// The announce budget of an interface: [`ANNOUNCE_CAP`] of its nominal
    /// bandwidth over [`BUDGET_WINDOW`].
    pub fn announce(bitrate_bps: u64, now: f64) -> Self {
        let rate = bitrate_bps as f64 / 8.0 * ANNOUNCE_CAP;
        Self::with_rate(rate, BUDGET_WINDOW, now)
    }

    /// The forwarded-bytes budget of an interface: full nominal bandwidth
    /// with a short burst window.
    pub fn forwarding(bitrate_bps: u64, now: f64) -> Self {
        let rate = bitrate_bps as f64 / 8.0;
        Self::with_rate(rate, FORWARD_BURST_WINDOW, now)
    }

    pub fn with_rate(rate_bytes_per_sec: f64, window: f64, now: f64) -> Self {
        let capacity = rate_bytes_per_sec * window;
        Self {
            rate: rate_bytes_per_sec,
            capacity,
            tokens: capacity,
            updated: now,
        }
    }

    fn refill(&mut self, now: f64) {
        let elapsed = (now - self.updated).max(0.0);
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.updated = now;
    }

    /// Try to spend `bytes` from the budget. Returns whether it fit.
    pub fn try_consume(&mut self, bytes: usize, now: f64) -> bool {
        self.refill(now);
        let cost = bytes as f64;
        if cost <= self.tokens {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// Currently available bytes.
    #[must_use]
    pub fn available(&mut self, now: f64) -> f64 {
        self.refill(now);
        self.tokens
    }
}

/// A queued announce awaiting budget.
#[derive(Debug, Clone)]
pub struct QueuedAnnounce {
    pub destination: DestinationHash,
    pub raw: Vec<u8>,
    pub hops: u8,
    pub queued_at: f64,
}

/// Overflow queue for one interface, drained in (hops, arrival) order.
#[derive(Debug, Default)]
pub struct AnnounceQueue {
    entries: VecDeque<QueuedAnnounce>,
}

impl AnnounceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an announce. A newer announce for the same destination replaces
    /// the queued one. Returns `false` when the queue is full.
    pub fn push(&mut self, announce: QueuedAnnounce) -> bool {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.destination == announce.destination)
        {
            *existing = announce;
            return true;
        }
        if self.entries.len() >= QUEUE_MAX_LEN {
            return false;
        }
        self.entries.push_back(announce);
        true
    }

    /// Remove and return the best queued announce (fewest hops, then oldest)
    /// whose size fits within `budget_bytes`.
    pub fn pop_within(&mut self, budget_bytes: f64) -> Option<QueuedAnnounce> {
        let best = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| (e.raw.len() as f64) <= budget_bytes)
            .min_by(|(_, a), (_, b)| {
                (a.hops, a.queued_at)
                    .partial_cmp(&(b.hops, b.queued_at))
                    .expect("queue times are never NaN")
            })
            .map(|(i, _)| i)?;
        self.entries.remove(best)
    }

    /// Drop entries older than [`QUEUE_MAX_AGE`].
    pub fn cull(&mut self, now: f64) {
        self.entries.retain(|e| now - e.queued_at < QUEUE_MAX_AGE);
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
