//! REST implementation of [`TokenService`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{TokenResponse, TokenService, TokenStatus};
use crate::config::TokenEndpointConfig;
use crate::error::{ClientError, ClientResult};

/// Token service reached over HTTP.
///
/// Sends `POST {base_url}{path}` with a bearer credential and
/// `{"scenarioId": n}`, and reads the backend's standard response envelope.
#[derive(Debug, Clone)]
pub struct HttpTokenService {
    http: Client,
    endpoint: String,
}

impl HttpTokenService {
    /// Build a client from endpoint settings
    pub fn new(config: &TokenEndpointConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint_url(),
        })
    }

    /// Full endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest {
    scenario_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum EnvelopeType {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAIL")]
    Fail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeException {
    error_no: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenItem {
    token: Option<String>,
    room_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: EnvelopeType,
    exception: Option<EnvelopeException>,
    item: Option<TokenItem>,
}

impl From<Envelope> for TokenResponse {
    fn from(envelope: Envelope) -> Self {
        let status = match envelope.kind {
            EnvelopeType::Success => TokenStatus::Success,
            EnvelopeType::Fail => TokenStatus::Fail,
        };
        let error_message = envelope.exception.map(|e| match (e.error_no, e.message) {
            (Some(no), Some(msg)) => format!("{} ({})", msg, no),
            (None, Some(msg)) => msg,
            (Some(no), None) => format!("error {}", no),
            (None, None) => "request failed".to_string(),
        });
        let (token, room_name) = match envelope.item {
            Some(item) => (item.token, item.room_name),
            None => (None, None),
        };

        TokenResponse {
            status,
            token,
            room_name,
            error_message,
        }
    }
}

/// Unreachable backend or timeout is a network error; anything else a setup failure
fn request_error(e: reqwest::Error) -> ClientError {
    if e.is_connect() || e.is_timeout() {
        ClientError::network(format!("token endpoint unreachable: {}", e))
    } else {
        ClientError::setup_failed(format!("token request failed: {}", e))
    }
}

fn parse_envelope(body: &str) -> ClientResult<TokenResponse> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ClientError::setup_failed(format!("malformed token response: {}", e)))?;
    Ok(envelope.into())
}

#[async_trait]
impl TokenService for HttpTokenService {
    async fn request_session(&self, credential: &str, scenario_id: u64) -> ClientResult<TokenResponse> {
        debug!(endpoint = %self.endpoint, scenario_id, "requesting session token");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(credential)
            .json(&TokenRequest { scenario_id })
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(request_error)?;

        if !status.is_success() {
            warn!(%status, scenario_id, "token endpoint returned an error status");
            // The backend still wraps most errors in its envelope.
            if let Ok(parsed) = parse_envelope(&body) {
                if parsed.status == TokenStatus::Fail {
                    return Ok(parsed);
                }
            }
            return Err(ClientError::setup_failed(format!(
                "token request failed ({})",
                status.as_u16()
            )));
        }

        parse_envelope(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_maps_to_response() {
        let body = r#"{
            "type": "SUCCESS",
            "exception": null,
            "item": { "token": "jwt", "roomName": "scenario-3-abc" }
        }"#;
        let response = parse_envelope(body).unwrap();
        assert_eq!(response, TokenResponse::success("jwt", "scenario-3-abc"));
    }

    #[test]
    fn fail_envelope_keeps_exception_message() {
        let body = r#"{
            "type": "FAIL",
            "exception": { "errorNo": "SCN-404", "message": "scenario not found" },
            "item": null
        }"#;
        let response = parse_envelope(body).unwrap();
        assert_eq!(response.status, TokenStatus::Fail);
        assert_eq!(
            response.error_message.as_deref(),
            Some("scenario not found (SCN-404)")
        );
        assert!(response.into_grant().is_err());
    }

    #[test]
    fn garbage_body_is_setup_failure() {
        let err = parse_envelope("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ClientError::SessionSetupFailed { .. }));
    }

    #[test]
    fn request_body_uses_camel_case() {
        let json = serde_json::to_string(&TokenRequest { scenario_id: 7 }).unwrap();
        assert_eq!(json, r#"{"scenarioId":7}"#);
    }

    #[test]
    fn endpoint_comes_from_config() {
        let config = TokenEndpointConfig {
            base_url: "https://api.example.com".into(),
            path: "/livekit/token".into(),
            timeout_ms: 2000,
        };
        let service = HttpTokenService::new(&config).unwrap();
        assert_eq!(service.endpoint(), "https://api.example.com/livekit/token");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let config = TokenEndpointConfig {
            base_url: "http://127.0.0.1:1".into(),
            path: "/livekit/token".into(),
            timeout_ms: 2000,
        };
        let service = HttpTokenService::new(&config).unwrap();

        let err = service.request_session("access", 1).await.unwrap_err();
        assert!(matches!(err, ClientError::NetworkError { .. }), "{err:?}");
    }
}
