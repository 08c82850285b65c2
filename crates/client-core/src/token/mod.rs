//! Session token acquisition
//!
//! Before a transport can join a room, the backend issues a short-lived
//! session token and the room name for the chosen scenario. The
//! [`TokenService`] trait is that contract; [`HttpTokenService`] is the REST
//! implementation.

mod http;

pub use http::HttpTokenService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Outcome reported by the token service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    Success,
    Fail,
}

/// Raw token service response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub status: TokenStatus,
    pub token: Option<String>,
    pub room_name: Option<String>,
    pub error_message: Option<String>,
}

impl TokenResponse {
    /// Successful response carrying a token and room
    pub fn success(token: impl Into<String>, room_name: impl Into<String>) -> Self {
        Self {
            status: TokenStatus::Success,
            token: Some(token.into()),
            room_name: Some(room_name.into()),
            error_message: None,
        }
    }

    /// Failed response
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: TokenStatus::Fail,
            token: None,
            room_name: None,
            error_message: Some(message.into()),
        }
    }

    /// Validate the response into a usable grant.
    ///
    /// `Fail`, a missing token or a missing room name all become
    /// [`ClientError::SessionSetupFailed`].
    pub fn into_grant(self) -> ClientResult<SessionGrant> {
        if self.status == TokenStatus::Fail {
            let reason = self
                .error_message
                .unwrap_or_else(|| "token service reported failure".to_string());
            return Err(ClientError::setup_failed(reason));
        }

        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::setup_failed("token missing from response"))?;
        let room_name = self
            .room_name
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ClientError::setup_failed("room name missing from response"))?;

        Ok(SessionGrant { token, room_name })
    }
}

/// Validated session credential
#[derive(Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// Token presented to the transport
    pub token: String,
    /// Room the token is valid for
    pub room_name: String,
}

impl std::fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGrant")
            .field("token", &"<redacted>")
            .field("room_name", &self.room_name)
            .finish()
    }
}

/// Issues session tokens for scenarios
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Request a session token for `scenario_id`, authenticated with `credential`
    async fn request_session(&self, credential: &str, scenario_id: u64) -> ClientResult<TokenResponse>;
}
