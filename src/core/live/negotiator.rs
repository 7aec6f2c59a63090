//! Live session negotiation.
//!
//! A live session starts with one `POST /v2/live` carrying the
//! [`SessionConfig`]. The API answers `201 Created` with a session id and the
//! WebSocket URL to stream to, or with a structured error body.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use url::Url;

use super::config::SessionConfig;
use super::session::LiveSession;
use crate::config::ClientConfig;
use crate::errors::{GladiaError, GladiaResult, NegotiationError};
use crate::utils::url_validation::validate_session_url;

/// Path of the live session endpoint.
pub const LIVE_PATH: &str = "/v2/live";

/// Result of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Session identifier
    pub id: String,
    /// WebSocket endpoint of the session (`wss://...`)
    pub url: String,
}

/// Client for the live transcription API.
///
/// ```rust,no_run
/// use gladia_client::config::ClientConfig;
/// use gladia_client::core::live::{LiveClient, SessionConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LiveClient::new(ClientConfig::from_env()?)?;
/// let session = client.connect(&SessionConfig::default()).await?;
///
/// session.events().on_transcript(|msg| async move {
///     if let Some(data) = msg.data() {
///         println!("{}", data.utterance.text);
///     }
/// });
///
/// if session.start().await {
///     session.send_audio_binary(vec![0u8; 3200]).await;
///     session.close(std::time::Duration::from_secs(10)).await;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LiveClient {
    config: ClientConfig,
    http_client: Client,
}

impl LiveClient {
    pub fn new(config: ClientConfig) -> GladiaResult<Self> {
        config.validate().map_err(GladiaError::Configuration)?;
        let http_client = config.build_http_client()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Client with default settings and the given API key.
    pub fn with_api_key(api_key: impl Into<String>) -> GladiaResult<Self> {
        Self::new(ClientConfig::new(api_key))
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full negotiation URL, region included.
    pub fn negotiation_url(&self) -> GladiaResult<Url> {
        let mut url = self.config.endpoint(LIVE_PATH)?;
        url.query_pairs_mut()
            .append_pair("region", self.config.region.as_str());
        Ok(url)
    }

    /// Negotiate a live session.
    ///
    /// Makes exactly one request and never retries.
    ///
    /// # Errors
    /// * `GladiaError::Network` - The request did not reach the API
    /// * `GladiaError::Negotiation` - The API answered with any status other
    ///   than 201
    /// * `GladiaError::InvalidResponse` - 201 with an unusable body
    /// * `GladiaError::Configuration` - `config` failed local validation
    pub async fn negotiate(&self, config: &SessionConfig) -> GladiaResult<SessionHandle> {
        config.validate().map_err(GladiaError::Configuration)?;

        let url = self.negotiation_url()?;
        debug!("Negotiating Gladia live session at {}", url);

        let response = self
            .http_client
            .post(url)
            .header("x-gladia-key", &self.config.api_key)
            .json(config)
            .send()
            .await
            .map_err(|e| GladiaError::Network(format!("Session negotiation request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GladiaError::Network(format!("Failed to read negotiation response: {e}")))?;

        if status != StatusCode::CREATED {
            let negotiation_error = NegotiationError::from_response(status.as_u16(), &body);
            error!("Gladia session negotiation failed: {}", negotiation_error);
            return Err(GladiaError::Negotiation(negotiation_error));
        }

        let handle: SessionHandle = serde_json::from_str(&body).map_err(|e| {
            GladiaError::InvalidResponse(format!("Invalid negotiation response: {e}"))
        })?;

        validate_session_url(&handle.url).map_err(|e| {
            GladiaError::InvalidResponse(format!("Invalid session URL {}: {e}", handle.url))
        })?;

        info!("Negotiated Gladia live session {}", handle.id);
        Ok(handle)
    }

    /// Negotiate and build a session that is ready to start.
    pub async fn connect(&self, config: &SessionConfig) -> GladiaResult<LiveSession> {
        let handle = self.negotiate(config).await?;
        Ok(LiveSession::new(handle).with_connect_timeout(self.config.connect_timeout))
    }
}
