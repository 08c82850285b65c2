//! Session state and event reconciliation
//!
//! [`SessionState`] is the single owner of everything the UI observes about a
//! session. It performs no I/O: the manager feeds it transport events and
//! lifecycle transitions, and it answers with the [`ClientEvent`]s describing
//! what changed.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::data::{decode_data_message, DataMessage};
use super::messages::{ConversationMessage, MessageKind, MessageLog, UpsertOutcome, UNKNOWN_SENDER};
use super::participants::{is_agent_identity, ParticipantRoster};
use crate::events::ClientEvent;
use crate::transport::{ConnectionState, RemoteParticipant, TranscriptionSegment, TransportEvent};

/// Read-only view of the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub connection_state: ConnectionState,
    pub is_connecting: bool,
    pub is_connected: bool,
    pub room_name: Option<String>,
    pub local_identity: Option<String>,
    pub agent_identity: Option<String>,
    pub is_agent_connected: bool,
    pub microphone_enabled: bool,
    pub participants: Vec<String>,
    pub messages: Vec<ConversationMessage>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        SessionState::new("agent").snapshot()
    }
}

/// Mutable session state
#[derive(Debug, Clone)]
pub struct SessionState {
    agent_marker: String,
    connection_state: ConnectionState,
    is_connecting: bool,
    room_name: Option<String>,
    local_identity: Option<String>,
    microphone_enabled: bool,
    participants: ParticipantRoster,
    agent_identity: Option<String>,
    messages: MessageLog,
}

impl SessionState {
    /// Fresh, disconnected state using `agent_marker` for agent detection
    pub fn new(agent_marker: impl Into<String>) -> Self {
        Self {
            agent_marker: agent_marker.into(),
            connection_state: ConnectionState::Disconnected,
            is_connecting: false,
            room_name: None,
            local_identity: None,
            microphone_enabled: true,
            participants: ParticipantRoster::new(),
            agent_identity: None,
            messages: MessageLog::new(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection_state: self.connection_state,
            is_connecting: self.is_connecting,
            is_connected: self.is_connected(),
            room_name: self.room_name.clone(),
            local_identity: self.local_identity.clone(),
            agent_identity: self.agent_identity.clone(),
            is_agent_connected: self.agent_identity.is_some(),
            microphone_enabled: self.microphone_enabled,
            participants: self.participants.identities().to_vec(),
            messages: self.messages.entries().to_vec(),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn is_connecting(&self) -> bool {
        self.is_connecting
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    pub fn agent_identity(&self) -> Option<&str> {
        self.agent_identity.as_deref()
    }

    pub fn local_identity(&self) -> Option<&str> {
        self.local_identity.as_deref()
    }

    pub fn microphone_enabled(&self) -> bool {
        self.microphone_enabled
    }

    pub fn participants(&self) -> &[String] {
        self.participants.identities()
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    // ── lifecycle transitions driven by the manager ──────────────────

    /// Mark a connect attempt as started
    pub fn begin_connect(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        self.set_connecting(true, &mut events);
        events
    }

    /// Apply the outcome of a successful transport connect.
    ///
    /// Enables the microphone, replaces the roster with the transport's
    /// current participants, picks the agent from that snapshot and appends a
    /// "connected" system message.
    pub fn complete_connect(
        &mut self,
        room_name: &str,
        local_identity: Option<String>,
        remote: &[RemoteParticipant],
    ) -> Vec<ClientEvent> {
        let mut events = Vec::new();

        self.room_name = Some(room_name.to_string());
        if let Some(identity) = local_identity.filter(|i| !i.is_empty()) {
            self.local_identity = Some(identity);
        }
        self.set_connection_state(ConnectionState::Connected, &mut events);

        if !self.microphone_enabled {
            self.microphone_enabled = true;
            events.push(ClientEvent::MicrophoneChanged { enabled: true });
        }

        self.participants
            .replace(remote.iter().map(|p| p.identity.as_str()));
        self.recompute_agent(&mut events);

        self.push_system(&format!("Connected to room {}", room_name), &mut events);
        self.set_connecting(false, &mut events);

        info!(
            room = room_name,
            participants = self.participants.len(),
            agent = ?self.agent_identity,
            "session connected"
        );
        events
    }

    /// Roll back a failed connect attempt to the disconnected state
    pub fn fail_connect(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        self.release_session(&mut events);
        self.set_connecting(false, &mut events);
        events
    }

    /// Clear everything after an explicit disconnect
    pub fn reset(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        self.release_session(&mut events);
        self.set_connecting(false, &mut events);
        self.messages.clear();
        events.extend(self.set_microphone_enabled(true));
        events.push(ClientEvent::SessionCleared);
        events
    }

    /// Record a committed microphone state
    pub fn set_microphone_enabled(&mut self, enabled: bool) -> Vec<ClientEvent> {
        if self.microphone_enabled == enabled {
            return Vec::new();
        }
        self.microphone_enabled = enabled;
        vec![ClientEvent::MicrophoneChanged { enabled }]
    }

    /// Append a chat message sent by the local participant
    pub fn push_local_chat(&mut self, text: &str) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        let sender = self.local_identity.clone().unwrap_or_else(|| "Me".to_string());
        if let Some(message) = ConversationMessage::new(sender, text, true, MessageKind::Chat) {
            self.append(message, &mut events);
        }
        events
    }

    // ── transport events ─────────────────────────────────────────────

    /// Reconcile one transport event
    pub fn apply(&mut self, event: TransportEvent) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        trace!(event = event.name(), "applying transport event");

        match event {
            TransportEvent::ConnectionStateChanged(state) => {
                self.set_connection_state(state, &mut events);
            }
            TransportEvent::Connected { local_identity } => {
                debug!(identity = %local_identity, "local participant connected");
                if !local_identity.is_empty() {
                    self.local_identity = Some(local_identity);
                }
                self.recompute_agent(&mut events);
            }
            TransportEvent::Disconnected { reason } => {
                info!(?reason, "transport disconnected");
                self.release_session(&mut events);
            }
            TransportEvent::ParticipantConnected(participant) => {
                self.participant_joined(&participant.identity, &mut events);
            }
            TransportEvent::ParticipantDisconnected(participant) => {
                self.participant_left(&participant.identity, &mut events);
            }
            TransportEvent::DataReceived {
                payload,
                participant,
            } => {
                let sender = participant
                    .map(|p| p.identity)
                    .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
                self.data_received(&payload, sender, &mut events);
            }
            TransportEvent::TranscriptionReceived {
                segments,
                participant_identity,
            } => {
                let sender = participant_identity.unwrap_or_else(|| UNKNOWN_SENDER.to_string());
                for segment in &segments {
                    self.transcription_received(&sender, segment, &mut events);
                }
            }
            TransportEvent::TrackPublished {
                participant_identity,
                track,
            }
            | TransportEvent::TrackUnpublished {
                participant_identity,
                track,
            } => {
                debug!(identity = %participant_identity, track = %track.sid, "track publication changed");
                self.recompute_agent(&mut events);
            }
            TransportEvent::TrackSubscribed {
                participant_identity,
                track,
            } => {
                debug!(identity = %participant_identity, kind = ?track.kind, "subscribed to track");
            }
            TransportEvent::TrackMuted {
                participant_identity,
                track,
            } => {
                debug!(identity = %participant_identity, track = %track.sid, "track muted");
            }
            TransportEvent::TrackUnmuted {
                participant_identity,
                track,
            } => {
                debug!(identity = %participant_identity, track = %track.sid, "track unmuted");
            }
        }

        events
    }

    fn participant_joined(&mut self, identity: &str, events: &mut Vec<ClientEvent>) {
        if !self.participants.insert(identity) {
            debug!(identity, "participant already tracked");
            return;
        }
        events.push(ClientEvent::ParticipantJoined {
            identity: identity.to_string(),
        });
        self.push_system(&format!("{} joined", identity), events);

        if self.agent_identity.is_none() && is_agent_identity(identity, &self.agent_marker) {
            self.set_agent(Some(identity.to_string()), events);
        }
    }

    fn participant_left(&mut self, identity: &str, events: &mut Vec<ClientEvent>) {
        if !self.participants.remove(identity) {
            debug!(identity, "unknown participant left");
            return;
        }
        events.push(ClientEvent::ParticipantLeft {
            identity: identity.to_string(),
        });
        self.push_system(&format!("{} left", identity), events);

        if self.agent_identity.as_deref() == Some(identity) {
            self.set_agent(None, events);
        }
    }

    fn data_received(&mut self, payload: &[u8], sender: String, events: &mut Vec<ClientEvent>) {
        match decode_data_message(payload) {
            Ok(DataMessage::Chat { text }) => {
                if let Some(message) = ConversationMessage::new(sender, &text, false, MessageKind::Chat) {
                    self.append(message, events);
                }
            }
            Ok(DataMessage::Unrecognized { kind }) => {
                debug!(sender = %sender, ?kind, "ignoring data message");
            }
            Err(e) => {
                warn!(sender = %sender, error = %e, "dropping malformed data message");
            }
        }
    }

    fn transcription_received(
        &mut self,
        sender: &str,
        segment: &TranscriptionSegment,
        events: &mut Vec<ClientEvent>,
    ) {
        let is_local = match self.local_identity.as_deref() {
            Some(local) => sender == local,
            None => !is_agent_identity(sender, &self.agent_marker),
        };

        match self.messages.upsert_transcription(sender, segment, is_local) {
            UpsertOutcome::Inserted { index } => {
                if let Some(message) = self.messages.get(index) {
                    events.push(ClientEvent::MessageAppended {
                        message: message.clone(),
                    });
                }
            }
            UpsertOutcome::Updated { index } => {
                if let Some(message) = self.messages.get(index) {
                    events.push(ClientEvent::MessageUpdated {
                        index,
                        message: message.clone(),
                    });
                }
            }
            UpsertOutcome::Unchanged | UpsertOutcome::Discarded => {}
        }
    }

    fn recompute_agent(&mut self, events: &mut Vec<ClientEvent>) {
        let agent = self
            .participants
            .first_agent(&self.agent_marker)
            .map(str::to_string);
        self.set_agent(agent, events);
    }

    fn set_agent(&mut self, agent: Option<String>, events: &mut Vec<ClientEvent>) {
        if self.agent_identity == agent {
            return;
        }
        debug!(agent = ?agent, "agent identity changed");
        self.agent_identity = agent.clone();
        events.push(ClientEvent::AgentChanged {
            agent_identity: agent,
        });
    }

    fn set_connection_state(&mut self, state: ConnectionState, events: &mut Vec<ClientEvent>) {
        if self.connection_state == state {
            return;
        }
        let previous = self.connection_state;
        self.connection_state = state;
        debug!(%previous, current = %state, "connection state changed");
        events.push(ClientEvent::ConnectionStateChanged {
            previous,
            current: state,
        });
    }

    fn set_connecting(&mut self, connecting: bool, events: &mut Vec<ClientEvent>) {
        if self.is_connecting == connecting {
            return;
        }
        self.is_connecting = connecting;
        events.push(ClientEvent::ConnectingChanged { connecting });
    }

    /// Drop the per-connection fields; the message log survives
    fn release_session(&mut self, events: &mut Vec<ClientEvent>) {
        self.set_connection_state(ConnectionState::Disconnected, events);
        self.set_agent(None, events);
        self.participants.clear();
        self.room_name = None;
        self.local_identity = None;
    }

    fn push_system(&mut self, text: &str, events: &mut Vec<ClientEvent>) {
        if let Some(message) = ConversationMessage::system(text) {
            self.append(message, events);
        }
    }

    fn append(&mut self, message: ConversationMessage, events: &mut Vec<ClientEvent>) {
        self.messages.push(message.clone());
        events.push(ClientEvent::MessageAppended { message });
    }
}
