//! Client configuration.
//!
//! Configuration is resolved in this order, later sources winning:
//!
//! 1. Built-in defaults
//! 2. Environment variables (a `.env` file is loaded by the binary at startup)
//! 3. YAML file passed to [`ClientConfig::from_file`]
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GLADIA_API_KEY` | `api_key` |
//! | `GLADIA_BASE_URL` | `base_url` |
//! | `GLADIA_REGION` | `region` (`us-west` or `eu-west`) |
//! | `GLADIA_REQUEST_TIMEOUT_SECS` | `request_timeout` |
//! | `GLADIA_CONNECT_TIMEOUT_SECS` | `connect_timeout` |
//!
//! # Example
//! ```rust,no_run
//! use gladia_client::config::ClientConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! println!("Using {} in {}", config.base_url, config.region);
//! # Ok(())
//! # }
//! ```

pub mod yaml;

use reqwest::Client;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::core::live::Region;
use crate::errors::{GladiaError, GladiaResult};

pub use yaml::{GladiaYaml, YamlConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.gladia.io";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GLADIA_API_KEY is not set")]
    MissingApiKey,

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings shared by the live and REST clients.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Sent as the `x-gladia-key` header
    pub api_key: String,
    /// Scheme and host of the API, without a trailing path
    pub base_url: String,
    /// Region for live sessions
    pub region: Region,
    pub user_agent: String,
    /// Whole-request timeout for HTTP calls. None means no timeout.
    pub request_timeout: Option<Duration>,
    /// Bound on the WebSocket handshake of live sessions
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            region: Region::default(),
            user_agent: default_user_agent(),
            request_timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

fn default_user_agent() -> String {
    format!("gladia-client-rust/{}", env!("CARGO_PKG_VERSION"))
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_seconds(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidValue {
            name,
            reason: format!("{value:?} is not a number of seconds ({e})"),
        })
}

impl ClientConfig {
    /// Default settings with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables only.
    ///
    /// # Errors
    /// Returns an error if `GLADIA_API_KEY` is missing or a variable has an
    /// invalid format.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::env_layer()?;
        if config.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load configuration from environment variables with a YAML file on top.
    ///
    /// The API key may come from either source.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let mut config = Self::env_layer()?;

        if let Some(gladia) = yaml_config.gladia {
            config.apply_yaml(gladia)?;
        }

        if config.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    fn env_layer() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(api_key) = env_var("GLADIA_API_KEY") {
            config.api_key = api_key.trim().to_string();
        }
        if let Some(base_url) = env_var("GLADIA_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(region) = env_var("GLADIA_REGION") {
            config.region = region.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "GLADIA_REGION",
                reason,
            })?;
        }
        if let Some(secs) = env_var("GLADIA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Some(parse_seconds("GLADIA_REQUEST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = env_var("GLADIA_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = parse_seconds("GLADIA_CONNECT_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }

    fn apply_yaml(&mut self, gladia: GladiaYaml) -> Result<(), ConfigError> {
        if let Some(api_key) = gladia.api_key {
            self.api_key = api_key;
        }
        if let Some(base_url) = gladia.base_url {
            self.base_url = base_url;
        }
        if let Some(region) = gladia.region {
            self.region = region.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "gladia.region",
                reason,
            })?;
        }
        if let Some(user_agent) = gladia.user_agent {
            self.user_agent = user_agent;
        }
        if let Some(secs) = gladia.request_timeout_seconds {
            self.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = gladia.connect_timeout_seconds {
            self.connect_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Check that the configuration can be used to build a client.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("API key is required".to_string());
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid base URL {}: {e}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "Base URL must use http or https, got: {}",
                url.scheme()
            ));
        }
        if url.host_str().is_none() {
            return Err(format!("Base URL has no host: {}", self.base_url));
        }

        if self.connect_timeout.is_zero() {
            return Err("connect timeout must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Absolute URL of an API path such as `/v2/live`.
    pub fn endpoint(&self, path: &str) -> GladiaResult<Url> {
        let base = self.base_url.trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| GladiaError::Configuration(format!("Invalid API URL: {e}")))
    }

    /// HTTP client with the configured user agent and timeout.
    pub(crate) fn build_http_client(&self) -> GladiaResult<Client> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent.clone())
            .pool_max_idle_per_host(4);
        if let Some(request_timeout) = self.request_timeout {
            builder = builder.timeout(request_timeout);
        }
        builder
            .build()
            .map_err(|e| GladiaError::Configuration(format!("Failed to create HTTP client: {e}")))
    }
}
