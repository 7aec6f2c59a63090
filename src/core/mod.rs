pub mod live;
pub mod rest;

// Re-export commonly used types for convenience
pub use live::{
    EventDispatcher, EventKind, LiveClient, LiveEvent, LiveSession, SessionConfig, SessionHandle,
    SessionState,
};
pub use rest::{GladiaRestClient, TranscriptionRequest, TranscriptionResult};
