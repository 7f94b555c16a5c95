//! # Adapter Implementations
//!
//! Concrete implementations of the outbound ports the node drives.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                   Node                      │
//! │        uses ↓                               │
//! │  ┌──────────────────────────────────────┐   │
//! │  │  ports: trait Communicator           │   │
//! │  └──────────────────────────────────────┘   │
//! │        ↑ implements                          │
//! │  ┌──────────────────────────────────────┐   │
//! │  │  InProcessCommunicator               │   │
//! │  └──────────────────────────────────────┘   │
//! └────────────────────────────────────────────┘
//! ```

pub mod communicator;
pub mod ports;

pub use communicator::InProcessCommunicator;
pub use ports::{Communicator, CommunicatorError};
