//! ConversationStore trait definition.
//!
//! One capability interface with two backend variants (durable SQLite,
//! ephemeral in-memory) selected by configuration, plus the cache-aside
//! decorator layered on top of the durable variant.

use parlance_types::chat::{Conversation, Message, MessageRole};
use parlance_types::error::StoreError;
use uuid::Uuid;

pub mod boxed;
pub mod cached;

pub use boxed::BoxConversationStore;
pub use cached::CachedStore;

/// Persistence interface for conversations and messages.
///
/// Implementations live in parlance-infra (e.g., `SqliteConversationStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Identifier and timestamp allocation happens inside the store at write
/// time, so concurrent appends never produce ambiguous ordering.
pub trait ConversationStore: Send + Sync {
    /// Create a conversation for `owner_id` and return the persisted record.
    fn create_conversation(
        &self,
        owner_id: Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<Conversation, StoreError>> + Send;

    /// Get a conversation by its unique ID.
    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, StoreError>> + Send;

    /// List conversations for an owner, ordered by updated_at DESC.
    fn list_conversations(
        &self,
        owner_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, StoreError>> + Send;

    /// Update a conversation's title, advancing updated_at.
    ///
    /// Returns `StoreError::NotFound` when the conversation does not exist.
    fn update_title(
        &self,
        id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a conversation and all its messages atomically.
    ///
    /// Returns `StoreError::NotFound` when the conversation does not exist.
    fn delete_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Append a message to an existing conversation, advancing the
    /// conversation's updated_at durably.
    ///
    /// Returns `StoreError::NotFound` when the conversation does not exist.
    fn append_message(
        &self,
        conversation_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Message, StoreError>> + Send;

    /// Get all messages of a conversation, ordered by created_at ASC.
    ///
    /// Returns `StoreError::NotFound` when the conversation does not exist.
    fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, StoreError>> + Send;
}
