pub mod bounded;
pub mod config;
pub mod error;
pub mod types;

pub use bounded::bounded;
pub use config::SymConfig;
pub use error::{Result, SymError};
pub use types::*;
