//! Real-time transport abstraction
//!
//! The transport is the media + data connection to the remote conversation
//! service. The session manager never talks to a concrete SDK; it drives a
//! [`Transport`] created by a [`TransportFactory`] and consumes the
//! [`TransportEvent`]s the transport pushes into its event sender.
//!
//! A factory receives the event sender *before* the transport connects, so
//! every event emitted during connection setup reaches the session manager.
//!
//! ```text
//! ┌────────────────┐  create(events)   ┌──────────────────┐
//! │ SessionManager │ ────────────────► │ TransportFactory │
//! └───────┬────────┘                   └────────┬─────────┘
//!         │ connect / mic / publish             │ Arc<dyn Transport>
//!         ▼                                     ▼
//! ┌────────────────┐   TransportEvent  ┌──────────────────┐
//! │   event pump   │ ◄──────────────── │    Transport     │
//! └────────────────┘   (one channel)   └──────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ClientResult;

/// Connection state as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// Connection in progress
    Connecting,
    /// Connected to the room
    Connected,
    /// Connection lost, transport is trying to recover
    Reconnecting,
    /// Connection failed permanently
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why the transport disconnected. Observational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// The local client asked to leave
    ClientInitiated,
    /// Another connection joined with the same identity
    DuplicateIdentity,
    /// The server is shutting down
    ServerShutdown,
    /// This participant was removed from the room
    ParticipantRemoved,
    /// The room was closed
    RoomDeleted,
    /// The signalling connection dropped
    SignalClosed,
    /// Any other reason reported by the transport
    Other(String),
}

/// A remote party in the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParticipant {
    /// Identity, unique within the room
    pub identity: String,
    /// Display name, if the transport provides one
    pub name: Option<String>,
}

impl RemoteParticipant {
    /// Participant with just an identity
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: None,
        }
    }
}

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A published or subscribed track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Track id assigned by the server
    pub sid: String,
    /// Media kind
    pub kind: TrackKind,
}

impl TrackInfo {
    /// Audio track with the given id
    pub fn audio(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            kind: TrackKind::Audio,
        }
    }
}

/// Speech-to-text fragment of one utterance.
///
/// The same `id` may be delivered several times as the transcription evolves
/// from interim to final text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    /// Stable id of the utterance
    pub id: String,
    /// Current text of the utterance
    pub text: String,
    /// Whether the transcription engine considers the text final
    pub is_final: bool,
    /// Time reported by the transcription engine, if any
    pub timestamp: Option<DateTime<Utc>>,
}

impl TranscriptionSegment {
    /// Segment without an engine timestamp
    pub fn new(id: impl Into<String>, text: impl Into<String>, is_final: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_final,
            timestamp: None,
        }
    }
}

/// Events delivered by the transport on its single event channel
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connection state transition
    ConnectionStateChanged(ConnectionState),
    /// Joined the room as `local_identity`
    Connected { local_identity: String },
    /// Left the room
    Disconnected { reason: DisconnectReason },
    /// A remote participant joined
    ParticipantConnected(RemoteParticipant),
    /// A remote participant left
    ParticipantDisconnected(RemoteParticipant),
    /// Data-channel payload
    DataReceived {
        payload: Vec<u8>,
        participant: Option<RemoteParticipant>,
    },
    /// Transcription update
    TranscriptionReceived {
        segments: Vec<TranscriptionSegment>,
        participant_identity: Option<String>,
    },
    /// A remote participant published a track
    TrackPublished {
        participant_identity: String,
        track: TrackInfo,
    },
    /// A remote participant unpublished a track
    TrackUnpublished {
        participant_identity: String,
        track: TrackInfo,
    },
    /// The local participant subscribed to a remote track
    TrackSubscribed {
        participant_identity: String,
        track: TrackInfo,
    },
    /// A track was muted
    TrackMuted {
        participant_identity: String,
        track: TrackInfo,
    },
    /// A track was unmuted
    TrackUnmuted {
        participant_identity: String,
        track: TrackInfo,
    },
}

impl TransportEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionStateChanged(_) => "connection_state_changed",
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::ParticipantConnected(_) => "participant_connected",
            Self::ParticipantDisconnected(_) => "participant_disconnected",
            Self::DataReceived { .. } => "data_received",
            Self::TranscriptionReceived { .. } => "transcription_received",
            Self::TrackPublished { .. } => "track_published",
            Self::TrackUnpublished { .. } => "track_unpublished",
            Self::TrackSubscribed { .. } => "track_subscribed",
            Self::TrackMuted { .. } => "track_muted",
            Self::TrackUnmuted { .. } => "track_unmuted",
        }
    }
}

/// Sending half of the transport event channel
pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half of the transport event channel
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// One real-time connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to `url` using the session `token`
    async fn connect(&self, url: &str, token: &str) -> ClientResult<()>;

    /// Leave the room and release the connection
    async fn disconnect(&self) -> ClientResult<()>;

    /// Publish or mute the local microphone track
    async fn set_microphone_enabled(&self, enabled: bool) -> ClientResult<()>;

    /// Send a data-channel payload to the room
    async fn publish_data(&self, payload: Vec<u8>, reliable: bool) -> ClientResult<()>;

    /// Remote participants currently in the room, in enumeration order
    fn remote_participants(&self) -> Vec<RemoteParticipant>;

    /// Identity of the local participant once connected
    fn local_identity(&self) -> Option<String>;
}

/// Creates transports bound to an event channel
pub trait TransportFactory: Send + Sync {
    /// Construct a fresh, unconnected transport that reports into `events`
    fn create(&self, events: TransportEventSender) -> Arc<dyn Transport>;
}
