//! Client configuration
//!
//! [`ClientConfig`] carries everything the session manager needs to reach the
//! remote conversation service: the real-time server address, the token
//! endpoint and the heuristic used to pick out the conversation agent.
//!
//! # Usage Examples
//!
//! ```rust
//! use voco_client_core::config::ClientConfig;
//!
//! let config = ClientConfig::new()
//!     .with_server_url("wss://rtc.example.com")
//!     .with_token_endpoint("https://api.example.com")
//!     .with_agent_marker("bot");
//!
//! assert_eq!(config.server_url, "wss://rtc.example.com");
//! assert_eq!(config.agent_marker, "bot");
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Loading from TOML
//!
//! ```rust
//! use voco_client_core::config::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str(r#"
//!     server_url = "wss://rtc.example.com"
//!
//!     [token]
//!     base_url = "https://api.example.com"
//!     timeout_ms = 5000
//! "#).unwrap();
//!
//! assert_eq!(config.token.timeout_ms, 5000);
//! assert_eq!(config.token.path, "/livekit/token");
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default real-time server address
pub const DEFAULT_SERVER_URL: &str = "wss://localhost:7880";

/// Default path of the session token endpoint
pub const DEFAULT_TOKEN_PATH: &str = "/livekit/token";

/// Default substring identifying the agent participant
pub const DEFAULT_AGENT_MARKER: &str = "agent";

/// Token endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenEndpointConfig {
    /// Base URL of the backend API (e.g. `https://api.example.com`)
    pub base_url: String,
    /// Path of the token endpoint, appended to `base_url`
    pub path: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TokenEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: DEFAULT_TOKEN_PATH.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl TokenEndpointConfig {
    /// Full URL of the token endpoint
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for the conversation client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Real-time server address (`ws://` or `wss://`)
    pub server_url: String,
    /// Token endpoint settings
    pub token: TokenEndpointConfig,
    /// Case-insensitive substring that marks a remote participant as the agent
    pub agent_marker: String,
    /// Capacity of the client event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: TokenEndpointConfig::default(),
            agent_marker: DEFAULT_AGENT_MARKER.to_string(),
            event_channel_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the real-time server address
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Set the backend base URL used for token requests
    pub fn with_token_endpoint(mut self, base_url: impl Into<String>) -> Self {
        self.token.base_url = base_url.into();
        self
    }

    /// Set the token request timeout
    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.token.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the agent identity marker
    pub fn with_agent_marker(mut self, marker: impl Into<String>) -> Self {
        self.agent_marker = marker.into();
        self
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ClientError::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check that addresses parse and limits are sane
    pub fn validate(&self) -> ClientResult<()> {
        let server = Url::parse(&self.server_url)
            .map_err(|e| ClientError::config(format!("server_url {:?}: {}", self.server_url, e)))?;
        if !matches!(server.scheme(), "ws" | "wss") {
            return Err(ClientError::config(format!(
                "server_url must use ws:// or wss://, got {}://",
                server.scheme()
            )));
        }

        let token = Url::parse(&self.token.base_url).map_err(|e| {
            ClientError::config(format!("token.base_url {:?}: {}", self.token.base_url, e))
        })?;
        if !matches!(token.scheme(), "http" | "https") {
            return Err(ClientError::config(format!(
                "token.base_url must use http:// or https://, got {}://",
                token.scheme()
            )));
        }

        if self.token.timeout_ms == 0 {
            return Err(ClientError::config("token.timeout_ms must be greater than zero"));
        }
        if self.agent_marker.trim().is_empty() {
            return Err(ClientError::config("agent_marker must not be empty"));
        }
        if self.event_channel_capacity == 0 {
            return Err(ClientError::config("event_channel_capacity must be greater than zero"));
        }
        Ok(())
    }
}
