//! Session state, participant tracking and message reconciliation
//!
//! Everything in this module is synchronous and free of I/O; the async
//! [`crate::SessionManager`] wraps it.

pub mod data;
pub mod messages;
pub mod participants;
pub mod state;

pub use data::{decode_data_message, encode_chat_message, DataMessage};
pub use messages::{
    transcription_key, ConversationMessage, MessageKind, MessageLog, UpsertOutcome, SYSTEM_SENDER,
    UNKNOWN_SENDER,
};
pub use participants::{is_agent_identity, ParticipantRoster};
pub use state::{SessionSnapshot, SessionState};
