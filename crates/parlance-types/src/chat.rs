//! Conversation, message, and chat-turn types for Parlance.
//!
//! A conversation belongs to one owner and holds an ordered list of messages.
//! `ChatRequest`/`ChatReply` are the wire shapes exchanged over the WebSocket
//! envelope protocol and the REST chat endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who produced a message within a conversation.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A conversation between one user and the model.
///
/// `owner_id` is immutable after creation. `updated_at` advances on every
/// message append and title change, so listing by `updated_at` descending
/// yields most-recently-active first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single message within a conversation.
///
/// Messages are totally ordered by `created_at` ascending within their
/// conversation; ties break by insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Sampling parameters for a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_new_tokens: u32,
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_new_tokens: 500,
            top_k: 40,
        }
    }
}

impl GenerationParams {
    /// Resolve request-supplied parameters against the defaults.
    ///
    /// Absent and zero values both fall back to the default, matching the
    /// wire contract where omitted fields arrive as zero.
    pub fn resolve(
        temperature: Option<f32>,
        max_new_tokens: Option<u32>,
        top_k: Option<u32>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            temperature: match temperature {
                Some(t) if t > 0.0 => t,
                _ => defaults.temperature,
            },
            max_new_tokens: match max_new_tokens {
                Some(n) if n > 0 => n,
                _ => defaults.max_new_tokens,
            },
            top_k: match top_k {
                Some(k) if k > 0 => k,
                _ => defaults.top_k,
            },
        }
    }
}

/// One chat turn as submitted by a client.
///
/// `conversation_id` absent or empty means "start a new conversation".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(
        default,
        deserialize_with = "uuid_or_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub conversation_id: Option<Uuid>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl ChatRequest {
    /// Sampling parameters with defaults applied.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams::resolve(self.temperature, self.max_new_tokens, self.top_k)
    }
}

/// The completed turn sent back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub conversation_id: Uuid,
    pub message: String,
    pub role: MessageRole,
}

/// Accept a missing field, `null`, or `""` as "no conversation yet".
///
/// Clients that serialize a zero-valued string field instead of omitting it
/// would otherwise fail UUID parsing.
fn uuid_or_empty<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s).map(Some).map_err(serde::de::Error::custom),
    }
}
