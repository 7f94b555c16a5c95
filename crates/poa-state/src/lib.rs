//! # poa-state
//!
//! Account state for the validator core.
//!
//! ## Role in System
//!
//! - **Stater**: opens a copy-on-write [`State`] overlay rooted at any
//!   committed state root
//! - **Speculative execution**: writes go to the overlay only; checkpoints
//!   let a caller roll back a rejected transaction
//! - **Stage**: the materialized, uncommitted result of an overlay;
//!   `commit()` persists it, dropping it discards it
//!
//! ```text
//! [Stater] ──new_state(root)──→ [State overlay] ──stage()──→ [Stage] ──commit()──→ [StateStore]
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
