//! Error types shared by the live and pre-recorded clients.
//!
//! Two provider error shapes are kept apart on purpose:
//!
//! - [`NegotiationError`]: returned by the HTTP API when a request is refused.
//!   Carries the list of validation failures.
//! - [`EventError`]: attached to a single live event when one feature fails
//!   for one utterance. The session keeps running.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Crate Error
// =============================================================================

/// Errors returned by negotiation and REST calls.
#[derive(Debug, Error)]
pub enum GladiaError {
    /// DNS, connect, TLS or read failure before any API answer was received
    #[error("Network error: {0}")]
    Network(String),

    /// The live session endpoint refused the configuration
    #[error("Session negotiation failed: {0}")]
    Negotiation(NegotiationError),

    /// A REST endpoint answered with an unexpected status
    #[error("API error: {0}")]
    Api(NegotiationError),

    /// The API answered with a body that could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Gave up waiting for the API
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Client-side configuration problem (missing key, bad URL, ...)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Gladia client operations.
pub type GladiaResult<T> = Result<T, GladiaError>;

impl GladiaError {
    /// True when the failure happened before the API produced an answer.
    #[inline]
    pub fn is_transport(&self) -> bool {
        matches!(self, GladiaError::Network(_))
    }

    /// The structured negotiation failure, if this is one.
    pub fn negotiation_error(&self) -> Option<&NegotiationError> {
        match self {
            GladiaError::Negotiation(err) => Some(err),
            _ => None,
        }
    }

    /// The structured REST failure, if this is one.
    pub fn api_error(&self) -> Option<&NegotiationError> {
        match self {
            GladiaError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status reported by the API, for negotiation and REST failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GladiaError::Negotiation(err) | GladiaError::Api(err) => Some(err.status_code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GladiaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GladiaError::InvalidResponse(err.to_string())
        } else {
            GladiaError::Network(err.to_string())
        }
    }
}

// =============================================================================
// Negotiation Error
// =============================================================================

/// Error body returned by the HTTP API on a refused request.
///
/// Every field defaults so that partial bodies still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationError {
    pub timestamp: String,
    pub path: String,
    pub request_id: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    pub validation_errors: Vec<String>,
}

impl NegotiationError {
    /// Build the error from a raw HTTP response.
    ///
    /// A JSON body is decoded as-is. Anything else is kept as the message so
    /// that proxy and gateway errors are not lost.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<NegotiationError>(body) {
            Ok(mut err) => {
                if err.status_code == 0 {
                    err.status_code = status;
                }
                err
            }
            Err(_) => NegotiationError {
                status_code: status,
                message: body.trim().to_string(),
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status_code, self.message)?;
        if !self.validation_errors.is_empty() {
            write!(f, " [{}]", self.validation_errors.join("; "))?;
        }
        if !self.request_id.is_empty() {
            write!(f, " (request_id: {})", self.request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for NegotiationError {}

// =============================================================================
// Event Error
// =============================================================================

/// Per-event failure delivered in place of an event's `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventError {
    pub status_code: i32,
    pub exception: String,
    pub message: String,
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.exception, self.status_code, self.message
        )
    }
}

impl std::error::Error for EventError {}
