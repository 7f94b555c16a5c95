pub mod memory_kv;
pub mod memory_repository;

pub use memory_kv::*;
pub use memory_repository::*;
