//! Error types for the conversation client
//!
//! Every fallible operation in this crate returns [`ClientResult`]. Errors raised
//! at the `connect` boundary are additionally broadcast to the UI layer as
//! [`crate::events::ClientEvent::Error`] notifications; decode errors never are.

use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while managing a conversation session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No access credential is available in the secret store
    #[error("Authentication required: no access credential is stored")]
    AuthenticationRequired,

    /// The token service refused or returned an unusable session grant
    #[error("Session setup failed: {reason}")]
    SessionSetupFailed { reason: String },

    /// The real-time transport could not connect
    #[error("Transport connect failed: {reason}")]
    TransportConnectFailed { reason: String },

    /// A data-channel payload could not be decoded
    #[error("Message decode error: {reason}")]
    MessageDecodeError { reason: String },

    /// A connect was requested while another connect or session is active
    #[error("Session busy: already {state}")]
    SessionBusy { state: String },

    /// A disconnect arrived while connect was still in flight
    #[error("Connect aborted by a disconnect request")]
    ConnectAborted,

    /// A transport operation failed during an active session
    #[error("Transport error during {operation}: {reason}")]
    TransportError { operation: String, reason: String },

    /// Configuration is invalid
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// Network-level failure talking to an external service
    #[error("Network error: {reason}")]
    NetworkError { reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ClientError {
    /// Create a session setup error
    pub fn setup_failed(reason: impl Into<String>) -> Self {
        Self::SessionSetupFailed {
            reason: reason.into(),
        }
    }

    /// Create a transport connect error
    pub fn connect_failed(reason: impl Into<String>) -> Self {
        Self::TransportConnectFailed {
            reason: reason.into(),
        }
    }

    /// Create a message decode error
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::MessageDecodeError {
            reason: reason.into(),
        }
    }

    /// Create a mid-session transport error
    pub fn transport(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransportError {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create a network error
    pub fn network(reason: impl Into<String>) -> Self {
        Self::NetworkError {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Short, stable name of the error kind for logs and notifications
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::SessionSetupFailed { .. } => "session_setup_failed",
            Self::TransportConnectFailed { .. } => "transport_connect_failed",
            Self::MessageDecodeError { .. } => "message_decode_error",
            Self::SessionBusy { .. } => "session_busy",
            Self::ConnectAborted => "connect_aborted",
            Self::TransportError { .. } => "transport_error",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::NetworkError { .. } => "network_error",
            Self::InternalError { .. } => "internal_error",
        }
    }

    /// Whether this error should be reported to the user.
    ///
    /// Decode errors are logged and dropped; everything else is surfaced.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::MessageDecodeError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_stay_out_of_the_ui() {
        assert!(!ClientError::decode("bad json").is_user_visible());
        assert!(ClientError::AuthenticationRequired.is_user_visible());
        assert!(ClientError::setup_failed("Fail").is_user_visible());
    }

    #[test]
    fn display_includes_reason() {
        let err = ClientError::transport("set_microphone_enabled", "track not published");
        assert_eq!(
            err.to_string(),
            "Transport error during set_microphone_enabled: track not published"
        );
        assert_eq!(err.category(), "transport_error");
    }
}
