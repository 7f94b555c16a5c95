//! # Outbound Ports
//!
//! Traits the node drives but does not implement itself.

pub mod communicator;

pub use communicator::{Communicator, CommunicatorError};
