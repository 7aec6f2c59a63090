//! Mock Gladia endpoints for integration tests.
//!
//! - `websocket_mock`: scripted live session peer built on `tokio-tungstenite`
//! - HTTP endpoints are mocked per test with `wiremock`

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod websocket_mock;

use serde_json::{Value, json};

pub use websocket_mock::{GladiaMockServer, MockSessionConfig, StopBehavior};

/// A server event frame in the live wire format.
pub fn event(message_type: &str, session_id: &str, data: Value) -> String {
    json!({
        "type": message_type,
        "session_id": session_id,
        "created_at": "2026-10-18T10:00:00.000Z",
        "data": data,
    })
    .to_string()
}

/// A lifecycle frame without data.
pub fn lifecycle(message_type: &str, session_id: &str) -> String {
    json!({
        "type": message_type,
        "session_id": session_id,
        "created_at": "2026-10-18T10:00:00.000Z",
    })
    .to_string()
}

/// Body of a successful negotiation.
pub fn negotiation_body(session_id: &str, url: &str) -> Value {
    json!({ "id": session_id, "url": url })
}
