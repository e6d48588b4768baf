//! Ephemeral in-memory conversation store.
//!
//! Same contract as the SQLite store, held in process memory behind an
//! `RwLock`. State is lost on restart; intended for tests and for running
//! without a database file. Runs bare, without the cache-aside layer.

use chrono::Utc;
use parlance_core::store::ConversationStore;
use parlance_types::chat::{Conversation, Message, MessageRole};
use parlance_types::error::StoreError;
use uuid::Uuid;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct MemoryState {
    conversations: HashMap<Uuid, Conversation>,
    // Message vectors are append-only, so insertion order is created order.
    messages: HashMap<Uuid, Vec<Message>>,
}

/// In-memory implementation of `ConversationStore`.
#[derive(Default)]
pub struct MemoryConversationStore {
    state: RwLock<MemoryState>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConversationStore for MemoryConversationStore {
    async fn create_conversation(
        &self,
        owner_id: Uuid,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::now_v7(),
            owner_id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.write();
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        state.messages.insert(conversation.id, Vec::new());

        Ok(conversation)
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        Ok(self.read().conversations.get(id).cloned())
    }

    async fn list_conversations(&self, owner_id: &Uuid) -> Result<Vec<Conversation>, StoreError> {
        let mut conversations: Vec<Conversation> = self
            .read()
            .conversations
            .values()
            .filter(|c| c.owner_id == *owner_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(conversations)
    }

    async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), StoreError> {
        let mut state = self.write();
        let conversation = state.conversations.get_mut(id).ok_or(StoreError::NotFound)?;
        conversation.title = title.to_string();
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_conversation(&self, id: &Uuid) -> Result<(), StoreError> {
        let mut state = self.write();
        if state.conversations.remove(id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.messages.remove(id);
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, StoreError> {
        let now = Utc::now();
        let message = Message {
            id: Uuid::now_v7(),
            conversation_id: *conversation_id,
            role,
            content: content.to_string(),
            created_at: now,
        };

        let mut state = self.write();
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or(StoreError::NotFound)?;
        conversation.updated_at = now;
        state
            .messages
            .entry(*conversation_id)
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, StoreError> {
        let state = self.read();
        if !state.conversations.contains_key(conversation_id) {
            return Err(StoreError::NotFound);
        }
        Ok(state
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_conversation() {
        let store = MemoryConversationStore::new();
        let owner = Uuid::now_v7();

        let created = store.create_conversation(owner, "hello").await.unwrap();
        let found = store.get_conversation(&created.id).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.title, "hello");
        assert_eq!(found.owner_id, owner);
    }

    #[tokio::test]
    async fn test_get_missing_conversation_returns_none() {
        let store = MemoryConversationStore::new();
        assert!(store
            .get_conversation(&Uuid::now_v7())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_conversations_most_recently_active_first() {
        let store = MemoryConversationStore::new();
        let owner = Uuid::now_v7();

        let first = store.create_conversation(owner, "first").await.unwrap();
        let second = store.create_conversation(owner, "second").await.unwrap();
        let third = store.create_conversation(owner, "third").await.unwrap();

        store
            .append_message(&first.id, MessageRole::User, "hello again")
            .await
            .unwrap();

        let listed = store.list_conversations(&owner).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, third.id, second.id]);
    }

    #[tokio::test]
    async fn test_list_conversations_scoped_to_owner() {
        let store = MemoryConversationStore::new();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        store.create_conversation(alice, "alice's").await.unwrap();
        store.create_conversation(bob, "bob's").await.unwrap();

        let listed = store.list_conversations(&alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "alice's");
    }

    #[tokio::test]
    async fn test_update_title_advances_updated_at() {
        let store = MemoryConversationStore::new();
        let owner = Uuid::now_v7();

        let created = store.create_conversation(owner, "before").await.unwrap();
        store.update_title(&created.id, "after").await.unwrap();

        let found = store.get_conversation(&created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "after");
        assert!(found.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_title_missing_conversation() {
        let store = MemoryConversationStore::new();
        let result = store.update_title(&Uuid::now_v7(), "anything").await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_conversation_removes_messages() {
        let store = MemoryConversationStore::new();
        let owner = Uuid::now_v7();

        let created = store.create_conversation(owner, "doomed").await.unwrap();
        store
            .append_message(&created.id, MessageRole::User, "hi")
            .await
            .unwrap();

        store.delete_conversation(&created.id).await.unwrap();

        assert!(store.get_conversation(&created.id).await.unwrap().is_none());
        let result = store.list_messages(&created.id).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_missing_conversation() {
        let store = MemoryConversationStore::new();
        let result = store.delete_conversation(&Uuid::now_v7()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_append_message_orders_and_bumps_conversation() {
        let store = MemoryConversationStore::new();
        let owner = Uuid::now_v7();

        let created = store.create_conversation(owner, "ordered").await.unwrap();
        for i in 0..4 {
            store
                .append_message(&created.id, MessageRole::User, &format!("turn {i}"))
                .await
                .unwrap();
        }

        let messages = store.list_messages(&created.id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["turn 0", "turn 1", "turn 2", "turn 3"]);
        assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let found = store.get_conversation(&created.id).await.unwrap().unwrap();
        assert!(found.updated_at >= created.updated_at);
        assert_eq!(found.updated_at, messages[3].created_at);
    }

    #[tokio::test]
    async fn test_append_message_missing_conversation() {
        let store = MemoryConversationStore::new();
        let result = store
            .append_message(&Uuid::now_v7(), MessageRole::User, "into the void")
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_messages_empty_conversation() {
        let store = MemoryConversationStore::new();
        let owner = Uuid::now_v7();

        let created = store.create_conversation(owner, "quiet").await.unwrap();
        assert!(store.list_messages(&created.id).await.unwrap().is_empty());
    }
}
