//! Radio transport
//!
//! Talks to the local XBee over a serial line in escaped API mode. Frames
//! are decoded once into `RadioResponse` at this boundary.

mod link;
mod serial;
mod traits;

pub use link::RadioLink;
pub use serial::open;
pub use traits::{Radio, RadioError};
