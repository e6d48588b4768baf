//! Cache-aside decorator for ConversationStore.
//!
//! Reads check the cache first and populate it on miss; every mutation
//! commits to the inner store first and only then deletes the stale cache
//! keys (write-then-invalidate, never write-through). The cache is advisory:
//! any cache failure is logged and absorbed, and the operation proceeds
//! against the inner store alone.
//!
//! There is a window between the durable commit and the invalidation during
//! which a concurrent reader can observe stale cached data. The window is
//! bounded (worst case: a failed invalidation survives until the entry's
//! TTL) and accepted -- this layer provides eventual consistency, not
//! linearizability.

use parlance_types::chat::{Conversation, Message, MessageRole};
use parlance_types::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use std::time::Duration;

use super::ConversationStore;
use crate::cache::Cache;

fn conversation_key(id: &Uuid) -> String {
    format!("conversation:{id}")
}

fn owner_list_key(owner_id: &Uuid) -> String {
    format!("user:{owner_id}:conversations")
}

fn message_list_key(conversation_id: &Uuid) -> String {
    format!("conversation:{conversation_id}:messages")
}

/// `ConversationStore` decorator adding cache-aside semantics.
///
/// Wraps the durable backend; the ephemeral backend runs without it.
pub struct CachedStore<S: ConversationStore, C: Cache> {
    inner: S,
    cache: C,
    ttl: Duration,
}

impl<S: ConversationStore, C: Cache> CachedStore<S, C> {
    /// Wrap `inner` with a cache holding snapshots for `ttl`.
    pub fn new(inner: S, cache: C, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    /// Access the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Cache lookup that treats every failure as a miss.
    ///
    /// Undecodable entries are reported and ignored; the next populate
    /// overwrites them.
    async fn cached_read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key, error = %err, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, falling through to store");
                None
            }
        }
    }

    /// Best-effort cache populate.
    async fn cache_populate<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(err) = self.cache.set(key, raw, self.ttl).await {
                    warn!(key, error = %err, "cache populate failed");
                }
            }
            Err(err) => warn!(key, error = %err, "cache encode failed"),
        }
    }

    /// Best-effort invalidation of the given keys.
    ///
    /// Deletion is idempotent, so concurrent mutators invalidating the same
    /// keys cannot conflict.
    async fn invalidate(&self, keys: &[String]) {
        for key in keys {
            if let Err(err) = self.cache.delete(key).await {
                warn!(key = %key, error = %err, "cache invalidation failed");
            }
        }
    }
}

impl<S: ConversationStore, C: Cache> ConversationStore for CachedStore<S, C> {
    async fn create_conversation(
        &self,
        owner_id: Uuid,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let conversation = self.inner.create_conversation(owner_id, title).await?;
        // Prime the fresh record; the owner's cached list is now stale.
        self.cache_populate(&conversation_key(&conversation.id), &conversation)
            .await;
        self.invalidate(&[owner_list_key(&owner_id)]).await;
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        let key = conversation_key(id);
        if let Some(hit) = self.cached_read::<Conversation>(&key).await {
            return Ok(Some(hit));
        }
        let found = self.inner.get_conversation(id).await?;
        // Absent conversations are not negatively cached.
        if let Some(conversation) = &found {
            self.cache_populate(&key, conversation).await;
        }
        Ok(found)
    }

    async fn list_conversations(&self, owner_id: &Uuid) -> Result<Vec<Conversation>, StoreError> {
        let key = owner_list_key(owner_id);
        if let Some(hit) = self.cached_read::<Vec<Conversation>>(&key).await {
            return Ok(hit);
        }
        let conversations = self.inner.list_conversations(owner_id).await?;
        self.cache_populate(&key, &conversations).await;
        Ok(conversations)
    }

    async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), StoreError> {
        let conversation = self
            .get_conversation(id)
            .await?
            .ok_or(StoreError::NotFound)?;
        self.inner.update_title(id, title).await?;
        self.invalidate(&[
            conversation_key(id),
            owner_list_key(&conversation.owner_id),
        ])
        .await;
        Ok(())
    }

    async fn delete_conversation(&self, id: &Uuid) -> Result<(), StoreError> {
        let conversation = self
            .get_conversation(id)
            .await?
            .ok_or(StoreError::NotFound)?;
        self.inner.delete_conversation(id).await?;
        self.invalidate(&[
            conversation_key(id),
            owner_list_key(&conversation.owner_id),
            message_list_key(id),
        ])
        .await;
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, StoreError> {
        // The owner is immutable, so resolving it through the cached path is
        // safe even when the entry is stale.
        let conversation = self
            .get_conversation(conversation_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        let message = self
            .inner
            .append_message(conversation_id, role, content)
            .await?;
        self.invalidate(&[
            message_list_key(conversation_id),
            conversation_key(conversation_id),
            owner_list_key(&conversation.owner_id),
        ])
        .await;
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, StoreError> {
        let key = message_list_key(conversation_id);
        if let Some(hit) = self.cached_read::<Vec<Message>>(&key).await {
            return Ok(hit);
        }
        let messages = self.inner.list_messages(conversation_id).await?;
        self.cache_populate(&key, &messages).await;
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parlance_types::error::CacheError;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const TEST_TTL: Duration = Duration::from_secs(3600);

    /// Map-backed store that counts how often the inner store is read.
    #[derive(Default)]
    struct RecordingStore {
        state: Mutex<RecordingState>,
        reads: AtomicUsize,
    }

    #[derive(Default)]
    struct RecordingState {
        conversations: Vec<Conversation>,
        messages: Vec<Message>,
    }

    impl RecordingStore {
        fn read_count(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl ConversationStore for RecordingStore {
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
            let mut state = self.state.lock().unwrap();
            state.conversations.push(conversation.clone());
            Ok(conversation)
        }

        async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let state = self.state.lock().unwrap();
            Ok(state.conversations.iter().find(|c| c.id == *id).cloned())
        }

        async fn list_conversations(
            &self,
            owner_id: &Uuid,
        ) -> Result<Vec<Conversation>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let state = self.state.lock().unwrap();
            let mut conversations: Vec<Conversation> = state
                .conversations
                .iter()
                .filter(|c| c.owner_id == *owner_id)
                .cloned()
                .collect();
            conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(conversations)
        }

        async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            let conversation = state
                .conversations
                .iter_mut()
                .find(|c| c.id == *id)
                .ok_or(StoreError::NotFound)?;
            conversation.title = title.to_string();
            conversation.updated_at = Utc::now();
            Ok(())
        }

        async fn delete_conversation(&self, id: &Uuid) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            let before = state.conversations.len();
            state.conversations.retain(|c| c.id != *id);
            if state.conversations.len() == before {
                return Err(StoreError::NotFound);
            }
            state.messages.retain(|m| m.conversation_id != *id);
            Ok(())
        }

        async fn append_message(
            &self,
            conversation_id: &Uuid,
            role: MessageRole,
            content: &str,
        ) -> Result<Message, StoreError> {
            let mut state = self.state.lock().unwrap();
            let now = Utc::now();
            let conversation = state
                .conversations
                .iter_mut()
                .find(|c| c.id == *conversation_id)
                .ok_or(StoreError::NotFound)?;
            conversation.updated_at = now;
            let message = Message {
                id: Uuid::now_v7(),
                conversation_id: *conversation_id,
                role,
                content: content.to_string(),
                created_at: now,
            };
            state.messages.push(message.clone());
            Ok(message)
        }

        async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let state = self.state.lock().unwrap();
            if !state.conversations.iter().any(|c| c.id == *conversation_id) {
                return Err(StoreError::NotFound);
            }
            Ok(state
                .messages
                .iter()
                .filter(|m| m.conversation_id == *conversation_id)
                .cloned()
                .collect())
        }
    }

    /// Map-backed cache that can be switched into a failing mode.
    #[derive(Default)]
    struct TestCache {
        entries: Mutex<HashMap<String, String>>,
        failing: AtomicBool,
    }

    impl TestCache {
        fn fail_everything(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }

        fn contains(&self, key: &str) -> bool {
            self.entries.lock().unwrap().contains_key(key)
        }

        fn poison(&self, key: &str, raw: &str) {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), raw.to_string());
        }
    }

    impl Cache for TestCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(CacheError::Backend("unreachable".to_string()));
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: String, _ttl: Duration) -> Result<(), CacheError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(CacheError::Backend("unreachable".to_string()));
            }
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(CacheError::Backend("unreachable".to_string()));
            }
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn test_store() -> CachedStore<RecordingStore, TestCache> {
        CachedStore::new(RecordingStore::default(), TestCache::default(), TEST_TTL)
    }

    #[tokio::test]
    async fn create_primes_conversation_entry() {
        let store = test_store();
        let owner = Uuid::now_v7();

        let conversation = store.create_conversation(owner, "First").await.unwrap();
        assert!(store.cache.contains(&conversation_key(&conversation.id)));

        // A read straight after creation is served from the primed entry.
        let reads_before = store.inner.read_count();
        let fetched = store.get_conversation(&conversation.id).await.unwrap();
        assert_eq!(fetched.unwrap().title, "First");
        assert_eq!(store.inner.read_count(), reads_before);
    }

    #[tokio::test]
    async fn get_miss_populates_and_second_read_hits() {
        let store = test_store();
        let owner = Uuid::now_v7();
        let conversation = store.create_conversation(owner, "Chat").await.unwrap();
        // Drop the primed entry to force a miss.
        store
            .cache
            .delete(&conversation_key(&conversation.id))
            .await
            .unwrap();

        let first = store.get_conversation(&conversation.id).await.unwrap();
        assert!(first.is_some());
        let reads_after_miss = store.inner.read_count();

        let second = store.get_conversation(&conversation.id).await.unwrap();
        assert!(second.is_some());
        assert_eq!(store.inner.read_count(), reads_after_miss);
    }

    #[tokio::test]
    async fn absent_conversation_is_not_negatively_cached() {
        let store = test_store();
        let id = Uuid::now_v7();

        assert!(store.get_conversation(&id).await.unwrap().is_none());
        assert!(!store.cache.contains(&conversation_key(&id)));
    }

    #[tokio::test]
    async fn update_title_survives_stale_cache() {
        let store = test_store();
        let owner = Uuid::now_v7();
        let conversation = store.create_conversation(owner, "Old title").await.unwrap();

        // The conversation entry is primed with the old title; after the
        // retitle no read may observe it.
        store
            .update_title(&conversation.id, "New title")
            .await
            .unwrap();
        assert!(!store.cache.contains(&conversation_key(&conversation.id)));

        let fetched = store.get_conversation(&conversation.id).await.unwrap();
        assert_eq!(fetched.unwrap().title, "New title");
    }

    #[tokio::test]
    async fn update_title_missing_is_not_found() {
        let store = test_store();
        let err = store
            .update_title(&Uuid::now_v7(), "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn append_invalidates_message_list() {
        let store = test_store();
        let owner = Uuid::now_v7();
        let conversation = store.create_conversation(owner, "Chat").await.unwrap();

        store
            .append_message(&conversation.id, MessageRole::User, "one")
            .await
            .unwrap();
        // Prime the message list, then append again; a stale hit would
        // return one message.
        assert_eq!(store.list_messages(&conversation.id).await.unwrap().len(), 1);
        store
            .append_message(&conversation.id, MessageRole::Assistant, "two")
            .await
            .unwrap();
        assert_eq!(store.list_messages(&conversation.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn append_invalidates_owner_list() {
        let store = test_store();
        let owner = Uuid::now_v7();
        let a = store.create_conversation(owner, "A").await.unwrap();
        let _b = store.create_conversation(owner, "B").await.unwrap();

        // Prime the owner list, then touch conversation A; the cached
        // ordering (B first) is now stale and must not be served.
        let before = store.list_conversations(&owner).await.unwrap();
        assert_eq!(before.first().unwrap().title, "B");

        store
            .append_message(&a.id, MessageRole::User, "bump")
            .await
            .unwrap();
        let after = store.list_conversations(&owner).await.unwrap();
        assert_eq!(after.first().unwrap().title, "A");
    }

    #[tokio::test]
    async fn delete_clears_every_associated_key() {
        let store = test_store();
        let owner = Uuid::now_v7();
        let conversation = store.create_conversation(owner, "Doomed").await.unwrap();
        store
            .append_message(&conversation.id, MessageRole::User, "hi")
            .await
            .unwrap();

        // Prime all three keys.
        store.get_conversation(&conversation.id).await.unwrap();
        store.list_conversations(&owner).await.unwrap();
        store.list_messages(&conversation.id).await.unwrap();

        store.delete_conversation(&conversation.id).await.unwrap();
        assert!(!store.cache.contains(&conversation_key(&conversation.id)));
        assert!(!store.cache.contains(&owner_list_key(&owner)));
        assert!(!store.cache.contains(&message_list_key(&conversation.id)));

        assert!(
            store
                .get_conversation(&conversation.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn failing_cache_degrades_to_inner_store() {
        let store = test_store();
        store.cache.fail_everything();
        let owner = Uuid::now_v7();

        let conversation = store.create_conversation(owner, "Resilient").await.unwrap();
        store
            .append_message(&conversation.id, MessageRole::User, "still works")
            .await
            .unwrap();
        store.update_title(&conversation.id, "Renamed").await.unwrap();

        let fetched = store.get_conversation(&conversation.id).await.unwrap();
        assert_eq!(fetched.unwrap().title, "Renamed");
        assert_eq!(store.list_messages(&conversation.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn undecodable_entry_falls_through() {
        let store = test_store();
        let owner = Uuid::now_v7();
        let conversation = store.create_conversation(owner, "Valid").await.unwrap();
        store
            .cache
            .poison(&conversation_key(&conversation.id), "{not json");

        let fetched = store.get_conversation(&conversation.id).await.unwrap();
        assert_eq!(fetched.unwrap().title, "Valid");
    }

    #[tokio::test]
    async fn list_messages_missing_conversation_is_not_found() {
        let store = test_store();
        let id = Uuid::now_v7();
        let err = store.list_messages(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(!store.cache.contains(&message_list_key(&id)));
    }
}
