pub mod mempool;

pub use mempool::*;
