//! Conversation message log
//!
//! The log is ordered by arrival, not by timestamp. Chat and system entries
//! are always appended. Transcription entries are keyed by
//! `transcription:<sender>:<segment id>` and updated in place when the same
//! utterance is re-delivered with new text, so an interim transcription turns
//! into its final form without moving in the log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transport::TranscriptionSegment;

/// Sender tag of system messages
pub const SYSTEM_SENDER: &str = "System";

/// Sender used when the transport does not say who sent a payload
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Origin of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Generated locally for UI feedback
    System,
    /// Data-channel chat text
    Chat,
    /// Speech-to-text of an utterance
    Transcription { is_final: bool },
}

/// One displayed unit of dialogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_local: bool,
    pub kind: MessageKind,
}

impl ConversationMessage {
    /// Message with a freshly generated id, or `None` if `text` is blank
    pub fn new(
        sender: impl Into<String>,
        text: &str,
        is_local: bool,
        kind: MessageKind,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            text: text.to_string(),
            timestamp: Utc::now(),
            is_local,
            kind,
        })
    }

    /// System message
    pub fn system(text: &str) -> Option<Self> {
        Self::new(SYSTEM_SENDER, text, false, MessageKind::System)
    }
}

/// Deterministic id of a transcription entry
pub fn transcription_key(sender: &str, segment_id: &str) -> String {
    format!("transcription:{}:{}", sender, segment_id)
}

/// Result of [`MessageLog::upsert_transcription`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New entry appended at `index`
    Inserted { index: usize },
    /// Existing entry at `index` got new text
    Updated { index: usize },
    /// Same text as before; nothing changed
    Unchanged,
    /// Blank text; nothing stored
    Discarded,
}

/// Append/update log of conversation messages
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<ConversationMessage>,
    index: HashMap<String, usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its position
    pub fn push(&mut self, message: ConversationMessage) -> usize {
        let position = self.entries.len();
        self.index.insert(message.id.clone(), position);
        self.entries.push(message);
        position
    }

    /// Insert or update the entry for `segment` from `sender`.
    ///
    /// `is_local` only applies to newly inserted entries; an update keeps the
    /// entry's position and origin and replaces its text and timestamp.
    pub fn upsert_transcription(
        &mut self,
        sender: &str,
        segment: &TranscriptionSegment,
        is_local: bool,
    ) -> UpsertOutcome {
        let text = segment.text.trim();
        if text.is_empty() {
            return UpsertOutcome::Discarded;
        }

        let key = transcription_key(sender, &segment.id);
        let timestamp = segment.timestamp.unwrap_or_else(Utc::now);
        let kind = MessageKind::Transcription {
            is_final: segment.is_final,
        };

        if let Some(&position) = self.index.get(&key) {
            let entry = &mut self.entries[position];
            if entry.text == text {
                return UpsertOutcome::Unchanged;
            }
            entry.text = text.to_string();
            entry.timestamp = timestamp;
            entry.kind = kind;
            return UpsertOutcome::Updated { index: position };
        }

        let index = self.push(ConversationMessage {
            id: key,
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp,
            is_local,
            kind,
        });
        UpsertOutcome::Inserted { index }
    }

    pub fn get(&self, index: usize) -> Option<&ConversationMessage> {
        self.entries.get(index)
    }

    /// Entry with the given id
    pub fn find(&self, id: &str) -> Option<&ConversationMessage> {
        self.index.get(id).and_then(|&i| self.entries.get(i))
    }

    pub fn entries(&self) -> &[ConversationMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, text: &str) -> TranscriptionSegment {
        TranscriptionSegment::new(id, text, false)
    }

    #[test]
    fn blank_messages_are_never_built() {
        assert!(ConversationMessage::system("   ").is_none());
        let msg = ConversationMessage::system("  hello ").unwrap();
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.sender, SYSTEM_SENDER);
    }

    #[test]
    fn same_segment_twice_is_idempotent() {
        let mut log = MessageLog::new();
        let seg = segment("s1", "How are you");

        assert_eq!(
            log.upsert_transcription("agent-1", &seg, false),
            UpsertOutcome::Inserted { index: 0 }
        );
        let before = log.entries().to_vec();

        assert_eq!(
            log.upsert_transcription("agent-1", &seg, false),
            UpsertOutcome::Unchanged
        );
        assert_eq!(log.entries(), before.as_slice());
    }

    #[test]
    fn changed_text_updates_in_place() {
        let mut log = MessageLog::new();
        log.upsert_transcription("agent-1", &segment("s1", "How"), false);
        log.push(ConversationMessage::system("user-1 joined").unwrap());

        let mut final_seg = TranscriptionSegment::new("s1", "How are you today?", true);
        let reported = "2026-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();
        final_seg.timestamp = Some(reported);

        assert_eq!(
            log.upsert_transcription("agent-1", &final_seg, false),
            UpsertOutcome::Updated { index: 0 }
        );
        assert_eq!(log.len(), 2);

        let entry = log.get(0).unwrap();
        assert_eq!(entry.id, "transcription:agent-1:s1");
        assert_eq!(entry.text, "How are you today?");
        assert_eq!(entry.timestamp, reported);
        assert_eq!(entry.kind, MessageKind::Transcription { is_final: true });
    }

    #[test]
    fn same_segment_id_from_different_senders_are_distinct() {
        let mut log = MessageLog::new();
        log.upsert_transcription("agent-1", &segment("s1", "Hi"), false);
        log.upsert_transcription("user-1", &segment("s1", "Hello"), true);
        assert_eq!(log.len(), 2);
        assert!(log.find("transcription:user-1:s1").unwrap().is_local);
    }

    #[test]
    fn blank_segment_is_discarded() {
        let mut log = MessageLog::new();
        assert_eq!(
            log.upsert_transcription("agent-1", &segment("s1", "  "), false),
            UpsertOutcome::Discarded
        );
        assert!(log.is_empty());
    }

    #[test]
    fn clear_forgets_keys() {
        let mut log = MessageLog::new();
        log.upsert_transcription("agent-1", &segment("s1", "Hi"), false);
        log.clear();
        assert_eq!(
            log.upsert_transcription("agent-1", &segment("s1", "Hi"), false),
            UpsertOutcome::Inserted { index: 0 }
        );
    }
}
