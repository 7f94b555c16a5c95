//! # Authority-Chain Test Suite
//!
//! Cross-crate scenarios that need the whole stack: packer, finality and the
//! node loop running over the same in-memory chain.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs      # Genesis, node and transaction builders
//!     ├── end_to_end.rs    # Genesis → schedule → pack → commit → finalize
//!     ├── cancellation.rs  # Peer block arriving mid-cycle
//!     ├── restart.rs       # Finality status survives a restart
//!     └── devnet.rs        # Several linked nodes rotating in real time
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p poa-tests
//! cargo test -p poa-tests integration::cancellation
//! ```

pub mod integration;
