//! # poa-txpool
//!
//! Pending-transaction pool consumed by the packer loop.
//!
//! ## Ordering
//!
//! `pending()` yields transactions by effective gas price (highest first),
//! then by arrival (earliest first). Each call returns an independent
//! snapshot, so a caller may iterate while other tasks add or remove.

pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::*;
