pub mod account;
pub mod errors;
pub mod state;

pub use account::*;
pub use errors::*;
pub use state::*;
