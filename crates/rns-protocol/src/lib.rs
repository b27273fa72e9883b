//! Session protocols for the rns network stack.
//!
//! Links are authenticated, encrypted, replay-protected sessions between
//! two destinations; resources are reliably delivered bulk payloads
//! segmented over a link with a sliding window. Both engines are pure:
//! the host moves packets and supplies the clock.

pub mod error;
pub mod link;
pub mod resource;

pub use error::{LinkError, ResourceError, ResourceFailure};
pub use link::{LinkActive, LinkClosed, LinkHandshake, LinkPending, LinkState};
pub use resource::{ResourceReceiver, ResourceSender, ResourceState};
