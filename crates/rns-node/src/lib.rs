//! Reference host embedding for the rns network stack.
//!
//! The engines in `rns-transport` and `rns-protocol` are pure; this crate
//! is the part that touches the world: sockets, the clock, persisted
//! state, configuration, logging, and the single driver task that owns
//! every engine table.

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod iface_udp;
pub mod logging;
pub mod node;
pub mod sessions;
pub mod storage;

pub use config::NodeConfig;
pub use driver::{Driver, NodeEvent};
pub use error::NodeError;
pub use node::Node;
