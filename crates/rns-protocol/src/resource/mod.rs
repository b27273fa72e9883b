//! Reliable bulk transfer over links.

pub mod advertisement;
pub mod transfer;
pub mod window;

pub use advertisement::{PartAck, ResourceAdvertisement};
pub use transfer::{ResourceReceiver, ResourceSender, ResourceState};
pub use window::WindowState;
