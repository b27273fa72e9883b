//! Authenticated, encrypted sessions between two destinations.

pub mod constants;
pub mod state;
pub mod types;

pub use state::{
    LinkActive, LinkClosed, LinkHandshake, LinkPending, LinkState, link_id_from_request,
};
pub use types::{DerivedKey, LinkRole, LinkStats, TeardownReason};
