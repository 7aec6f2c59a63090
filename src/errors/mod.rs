pub mod gladia_error;

pub use gladia_error::{EventError, GladiaError, GladiaResult, NegotiationError};
