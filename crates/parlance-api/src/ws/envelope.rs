//! Wire envelopes for the WebSocket session protocol.
//!
//! Every frame is a JSON object `{"type": string, "content": <opaque JSON>}`.
//! Inbound decoding is two-stage (outer envelope, then typed content) so an
//! unrecognized type and a malformed payload produce distinct error
//! messages, both answered over the connection rather than closing it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use parlance_types::chat::{ChatReply, ChatRequest, Message};

/// Outer frame shape shared by every inbound message.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: serde_json::Value,
}

/// Payload of an inbound `history` envelope.
#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub conversation_id: Uuid,
}

/// A decoded inbound envelope.
#[derive(Debug)]
pub enum Inbound {
    Chat(ChatRequest),
    History(HistoryRequest),
}

/// Why an inbound frame could not be decoded.
///
/// All variants are protocol-level: the session reports them in an `error`
/// envelope and keeps the connection open.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("invalid chat request: {0}")]
    InvalidChat(String),

    #[error("invalid history request: {0}")]
    InvalidHistory(String),

    #[error("unsupported message type '{0}'")]
    UnknownType(String),
}

impl Inbound {
    /// Decode one text frame.
    pub fn decode(raw: &str) -> Result<Self, EnvelopeError> {
        let envelope: RawEnvelope =
            serde_json::from_str(raw).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

        match envelope.kind.as_str() {
            "chat" => serde_json::from_value(envelope.content)
                .map(Inbound::Chat)
                .map_err(|e| EnvelopeError::InvalidChat(e.to_string())),
            "history" => serde_json::from_value(envelope.content)
                .map(Inbound::History)
                .map_err(|e| EnvelopeError::InvalidHistory(e.to_string())),
            other => Err(EnvelopeError::UnknownType(other.to_string())),
        }
    }
}

/// An outbound envelope, serialized as `{"type", "content"}`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum Outbound {
    Chat(ChatReply),
    History(Vec<Message>),
    Error { message: String },
}

impl Outbound {
    /// Shorthand for an `error` envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Outbound::Error {
            message: message.into(),
        }
    }
}
