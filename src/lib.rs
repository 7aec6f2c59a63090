pub mod config;
pub mod core;
pub mod errors;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::ClientConfig;
pub use core::*;
pub use errors::{EventError, GladiaError, GladiaResult, NegotiationError};
