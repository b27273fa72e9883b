//! Routing and pathfinding for the rns network stack.
//!
//! The [`engine::TransportEngine`] is a pure state machine: the host feeds
//! it frames, outbound packets and clock ticks, and applies the ordered
//! action batches it returns. Protocol-level failures (malformed frames,
//! replays, bad signatures) are never surfaced as errors; they become
//! [`action::TransportAction::Drop`] actions and counters.

pub mod action;
pub mod announce_queue;
pub mod decision;
pub mod dedup;
pub mod engine;
pub mod iface;
pub mod path;
pub mod tables;

pub use action::{DropReason, TransportAction, TransportStats};
pub use engine::{TransportConfig, TransportEngine};
pub use iface::{InterfaceId, InterfaceInfo, InterfaceMode};
