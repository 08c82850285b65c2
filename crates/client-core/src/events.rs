//! Client events
//!
//! The session manager broadcasts a [`ClientEvent`] for every observable
//! change so a UI layer can react without polling. The complete state is also
//! available as a [`crate::SessionSnapshot`] through
//! [`crate::SessionManager::watch`].
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use voco_client_core::{ClientEvent, SessionManager};
//!
//! # async fn example(manager: SessionManager) {
//! let mut events = manager.subscribe();
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         ClientEvent::Error { error } => eprintln!("connect failed: {}", error),
//!         ClientEvent::MessageAppended { message } => println!("{}: {}", message.sender, message.text),
//!         other => println!("{:?}", other),
//!     }
//! }
//! # }
//! ```

use crate::error::ClientError;
use crate::session::ConversationMessage;
use crate::transport::ConnectionState;

/// Event priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// Diagnostic detail
    Low,
    /// Regular state updates
    Normal,
    /// Changes the user should notice
    High,
    /// Failures that need user attention
    Critical,
}

/// Observable change in the session
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection state changed
    ConnectionStateChanged {
        previous: ConnectionState,
        current: ConnectionState,
    },
    /// A connect attempt started (`true`) or settled (`false`)
    ConnectingChanged { connecting: bool },
    /// A remote participant joined
    ParticipantJoined { identity: String },
    /// A remote participant left
    ParticipantLeft { identity: String },
    /// The tracked agent identity changed
    AgentChanged { agent_identity: Option<String> },
    /// A message was appended to the log
    MessageAppended { message: ConversationMessage },
    /// A transcription entry was updated in place
    MessageUpdated {
        index: usize,
        message: ConversationMessage,
    },
    /// Local microphone state changed
    MicrophoneChanged { enabled: bool },
    /// Session state was cleared by a disconnect
    SessionCleared,
    /// A user-visible failure
    Error { error: ClientError },
}

impl ClientEvent {
    /// Priority of this event
    pub fn priority(&self) -> EventPriority {
        match self {
            Self::Error { .. } => EventPriority::Critical,
            Self::ConnectionStateChanged { .. }
            | Self::AgentChanged { .. }
            | Self::SessionCleared => EventPriority::High,
            Self::ParticipantJoined { .. }
            | Self::ParticipantLeft { .. }
            | Self::MessageAppended { .. }
            | Self::MicrophoneChanged { .. }
            | Self::ConnectingChanged { .. } => EventPriority::Normal,
            Self::MessageUpdated { .. } => EventPriority::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_critical() {
        let event = ClientEvent::Error {
            error: ClientError::AuthenticationRequired,
        };
        assert_eq!(event.priority(), EventPriority::Critical);
        assert!(event.priority() > ClientEvent::SessionCleared.priority());
    }
}
