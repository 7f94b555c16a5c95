//! Domain layer for the transaction pool.
//!
//! - `value_objects`: PricedTransaction
//! - `errors`: MempoolError enumeration
//! - `pool`: TxPool

pub mod errors;
pub mod pool;
pub mod value_objects;

pub use errors::*;
pub use pool::*;
pub use value_objects::*;
