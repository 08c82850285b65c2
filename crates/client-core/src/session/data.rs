//! Data-channel payload codec
//!
//! Payloads are UTF-8 JSON objects with a `type` discriminant. Only
//! `{"type":"chat","text":"..."}` is understood; other types are ignored.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Discriminant of chat payloads
pub const CHAT_TYPE: &str = "chat";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

/// Decoded data-channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMessage {
    /// Chat text
    Chat { text: String },
    /// Valid JSON with a discriminant this client does not handle
    Unrecognized { kind: Option<String> },
}

/// Decode a data-channel payload.
///
/// Fails with [`ClientError::MessageDecodeError`] for non-UTF-8 bytes,
/// invalid JSON, or a chat payload without text.
pub fn decode_data_message(payload: &[u8]) -> ClientResult<DataMessage> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| ClientError::decode(format!("payload is not UTF-8: {}", e)))?;
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| ClientError::decode(format!("payload is not a JSON object: {}", e)))?;

    match envelope.kind.as_deref() {
        Some(CHAT_TYPE) => match envelope.text {
            Some(text) => Ok(DataMessage::Chat { text }),
            None => Err(ClientError::decode("chat payload has no text")),
        },
        _ => Ok(DataMessage::Unrecognized {
            kind: envelope.kind,
        }),
    }
}

/// Encode chat text for publishing
pub fn encode_chat_message(text: &str) -> ClientResult<Vec<u8>> {
    serde_json::to_vec(&ChatPayload {
        kind: CHAT_TYPE,
        text,
    })
    .map_err(|e| ClientError::internal(format!("failed to encode chat payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chat() {
        let msg = decode_data_message(br#"{"type":"chat","text":"hello"}"#).unwrap();
        assert_eq!(msg, DataMessage::Chat { text: "hello".into() });
    }

    #[test]
    fn other_types_are_unrecognized() {
        let msg = decode_data_message(br#"{"type":"score","value":3}"#).unwrap();
        assert_eq!(msg, DataMessage::Unrecognized { kind: Some("score".into()) });
    }

    #[test]
    fn malformed_payloads_are_decode_errors() {
        for payload in [&b"not json"[..], &[0xff, 0xfe][..], &br#"{"type":"chat"}"#[..], &b"[1,2]"[..]] {
            let err = decode_data_message(payload).unwrap_err();
            assert_eq!(err.category(), "message_decode_error");
        }
    }

    #[test]
    fn encodes_chat_payload() {
        let bytes = encode_chat_message("see you").unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"type":"chat","text":"see you"}"#
        );
    }
}
