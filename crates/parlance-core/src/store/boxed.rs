//! BoxConversationStore -- object-safe dynamic dispatch wrapper for
//! ConversationStore.
//!
//! The backend (durable SQLite behind the cache-aside layer, or the
//! ephemeral in-memory store) is picked at startup from configuration, so
//! the application state needs one concrete type covering both:
//! 1. Define an object-safe `ConversationStoreDyn` trait with boxed futures
//! 2. Blanket-impl `ConversationStoreDyn` for all `T: ConversationStore`
//! 3. `BoxConversationStore` wraps `Box<dyn ConversationStoreDyn>` and
//!    implements `ConversationStore` by delegation

use std::future::Future;
use std::pin::Pin;

use parlance_types::chat::{Conversation, Message, MessageRole};
use parlance_types::error::StoreError;
use uuid::Uuid;

use super::ConversationStore;

/// Object-safe version of [`ConversationStore`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch
/// (`dyn ConversationStoreDyn`). A blanket implementation is provided for
/// all types implementing `ConversationStore`.
pub trait ConversationStoreDyn: Send + Sync {
    fn create_conversation_boxed<'a>(
        &'a self,
        owner_id: Uuid,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Conversation, StoreError>> + Send + 'a>>;

    fn get_conversation_boxed<'a>(
        &'a self,
        id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Conversation>, StoreError>> + Send + 'a>>;

    fn list_conversations_boxed<'a>(
        &'a self,
        owner_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Conversation>, StoreError>> + Send + 'a>>;

    fn update_title_boxed<'a>(
        &'a self,
        id: &'a Uuid,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    fn delete_conversation_boxed<'a>(
        &'a self,
        id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    fn append_message_boxed<'a>(
        &'a self,
        conversation_id: &'a Uuid,
        role: MessageRole,
        content: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Message, StoreError>> + Send + 'a>>;

    fn list_messages_boxed<'a>(
        &'a self,
        conversation_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + 'a>>;
}

/// Blanket implementation: any `ConversationStore` automatically implements
/// `ConversationStoreDyn`.
impl<T: ConversationStore> ConversationStoreDyn for T {
    fn create_conversation_boxed<'a>(
        &'a self,
        owner_id: Uuid,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Conversation, StoreError>> + Send + 'a>> {
        Box::pin(self.create_conversation(owner_id, title))
    }

    fn get_conversation_boxed<'a>(
        &'a self,
        id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Conversation>, StoreError>> + Send + 'a>> {
        Box::pin(self.get_conversation(id))
    }

    fn list_conversations_boxed<'a>(
        &'a self,
        owner_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Conversation>, StoreError>> + Send + 'a>> {
        Box::pin(self.list_conversations(owner_id))
    }

    fn update_title_boxed<'a>(
        &'a self,
        id: &'a Uuid,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(self.update_title(id, title))
    }

    fn delete_conversation_boxed<'a>(
        &'a self,
        id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(self.delete_conversation(id))
    }

    fn append_message_boxed<'a>(
        &'a self,
        conversation_id: &'a Uuid,
        role: MessageRole,
        content: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Message, StoreError>> + Send + 'a>> {
        Box::pin(self.append_message(conversation_id, role, content))
    }

    fn list_messages_boxed<'a>(
        &'a self,
        conversation_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + 'a>> {
        Box::pin(self.list_messages(conversation_id))
    }
}

/// Type-erased conversation store for runtime backend selection.
///
/// Since `ConversationStore` uses RPITIT, it cannot be used as a trait
/// object directly. `BoxConversationStore` wraps any implementation behind
/// dynamic dispatch and re-implements `ConversationStore`, so generic
/// consumers (`ChatService`, `CachedStore`) accept it unchanged.
pub struct BoxConversationStore {
    inner: Box<dyn ConversationStoreDyn>,
}

impl BoxConversationStore {
    /// Wrap a concrete `ConversationStore` in a type-erased box.
    pub fn new<T: ConversationStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl ConversationStore for BoxConversationStore {
    async fn create_conversation(
        &self,
        owner_id: Uuid,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        self.inner.create_conversation_boxed(owner_id, title).await
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        self.inner.get_conversation_boxed(id).await
    }

    async fn list_conversations(&self, owner_id: &Uuid) -> Result<Vec<Conversation>, StoreError> {
        self.inner.list_conversations_boxed(owner_id).await
    }

    async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), StoreError> {
        self.inner.update_title_boxed(id, title).await
    }

    async fn delete_conversation(&self, id: &Uuid) -> Result<(), StoreError> {
        self.inner.delete_conversation_boxed(id).await
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, StoreError> {
        self.inner
            .append_message_boxed(conversation_id, role, content)
            .await
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, StoreError> {
        self.inner.list_messages_boxed(conversation_id).await
    }
}
