//! # Voco Client Core - Real-Time Conversation Sessions
//!
//! Client-side session management for voice conversations with an AI agent
//! in a real-time room. The crate covers:
//!
//! - **Session lifecycle**: credential lookup, token acquisition, transport
//!   connect and teardown, with rollback on every failure path
//! - **Event reconciliation**: participant tracking, agent detection and the
//!   conversation log (system notices, chat, live transcriptions)
//! - **Observation**: a watchable [`SessionSnapshot`] plus a [`ClientEvent`]
//!   stream for UI layers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voco_client_core::{ClientConfig, SessionManagerBuilder, TransportFactory};
//!
//! # async fn example(factory: Arc<dyn TransportFactory>) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = SessionManagerBuilder::new()
//!     .config(ClientConfig::new().with_server_url("wss://rtc.example.com"))
//!     .transport_factory(factory)
//!     .build()?;
//!
//! manager.connect(42).await?;
//! println!("agent: {:?}", manager.agent_identity());
//!
//! manager.toggle_microphone().await?;
//! manager.send_message("hello").await?;
//! manager.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The real-time SDK sits behind the [`Transport`] trait and the token
//! backend behind [`TokenService`], so the manager can be driven by any SDK
//! binding and tested with in-memory doubles. All reconciliation logic lives
//! in the synchronous [`SessionState`].

pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod secret;
pub mod session;
pub mod token;
pub mod transport;

// Re-export main types
pub use audio::{AudioSession, AudioSessionGuard, NoopAudioSession};
pub use client::{SessionManager, SessionManagerBuilder};
pub use config::{ClientConfig, TokenEndpointConfig};
pub use error::{ClientError, ClientResult};
pub use events::{ClientEvent, EventPriority};
pub use secret::{EnvSecretStore, MemorySecretStore, SecretStore};
pub use session::{ConversationMessage, MessageKind, SessionSnapshot, SessionState};
pub use token::{HttpTokenService, SessionGrant, TokenResponse, TokenService, TokenStatus};
pub use transport::{
    ConnectionState, DisconnectReason, RemoteParticipant, TrackInfo, TrackKind,
    TranscriptionSegment, Transport, TransportEvent, TransportEventSender, TransportFactory,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
