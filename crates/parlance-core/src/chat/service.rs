//! Chat service orchestrating the per-turn workflow.
//!
//! ChatService coordinates the ConversationStore and the TextGenerator:
//! resolving (or creating) the conversation, persisting the user turn,
//! rendering the transcript prompt, invoking the model under the caller's
//! deadline, and persisting the reply.

use parlance_types::chat::{ChatReply, ChatRequest, Conversation, Message, MessageRole};
use parlance_types::error::ChatError;
use tracing::{info, warn};
use uuid::Uuid;

use std::time::Duration;

use crate::chat::prompt::render_transcript;
use crate::chat::title::derive_title;
use crate::generate::TextGenerator;
use crate::store::ConversationStore;

/// Orchestrates one chat turn and the conversation management operations
/// around it.
///
/// Generic over `ConversationStore` and `TextGenerator` to maintain clean
/// architecture (parlance-core never depends on parlance-infra). Every
/// operation that touches a specific conversation enforces ownership before
/// any mutation.
pub struct ChatService<S: ConversationStore, G: TextGenerator> {
    store: S,
    generator: G,
}

impl<S: ConversationStore, G: TextGenerator> ChatService<S, G> {
    /// Create a new chat service over the given store and generator.
    pub fn new(store: S, generator: G) -> Self {
        Self { store, generator }
    }

    /// Access the conversation store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one chat turn.
    ///
    /// An absent `conversation_id` starts a new conversation titled from the
    /// message. The deadline bounds only the generation call; a generation
    /// failure leaves the already-persisted user message in place, which is
    /// user-visible as "your message was saved, generation failed".
    pub async fn chat(
        &self,
        user_id: Uuid,
        request: &ChatRequest,
        deadline: Duration,
    ) -> Result<ChatReply, ChatError> {
        let conversation = match request.conversation_id {
            None => {
                let title = derive_title(&request.message);
                let conversation = self.store.create_conversation(user_id, &title).await?;
                info!(
                    conversation_id = %conversation.id,
                    user_id = %user_id,
                    "conversation created"
                );
                conversation
            }
            Some(id) => self.owned_conversation(user_id, &id).await?,
        };

        self.store
            .append_message(&conversation.id, MessageRole::User, &request.message)
            .await?;

        // History now includes the turn persisted above.
        let history = self.store.list_messages(&conversation.id).await?;
        let prompt = render_transcript(&history);
        let params = request.generation_params();

        let reply = self.generator.generate(&prompt, &params, deadline).await?;

        self.store
            .append_message(&conversation.id, MessageRole::Assistant, &reply)
            .await?;

        Ok(ChatReply {
            conversation_id: conversation.id,
            message: reply,
            role: MessageRole::Assistant,
        })
    }

    /// Ordered message history of an owned conversation.
    pub async fn history(
        &self,
        user_id: Uuid,
        conversation_id: &Uuid,
    ) -> Result<Vec<Message>, ChatError> {
        self.owned_conversation(user_id, conversation_id).await?;
        Ok(self.store.list_messages(conversation_id).await?)
    }

    /// All conversations of `user_id`, most recently active first.
    pub async fn conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, ChatError> {
        Ok(self.store.list_conversations(&user_id).await?)
    }

    /// Rename an owned conversation.
    pub async fn rename(
        &self,
        user_id: Uuid,
        conversation_id: &Uuid,
        title: &str,
    ) -> Result<(), ChatError> {
        self.owned_conversation(user_id, conversation_id).await?;
        self.store.update_title(conversation_id, title).await?;
        info!(conversation_id = %conversation_id, "conversation renamed");
        Ok(())
    }

    /// Delete an owned conversation and its messages.
    pub async fn delete(&self, user_id: Uuid, conversation_id: &Uuid) -> Result<(), ChatError> {
        self.owned_conversation(user_id, conversation_id).await?;
        self.store.delete_conversation(conversation_id).await?;
        info!(conversation_id = %conversation_id, "conversation deleted");
        Ok(())
    }

    /// Fetch a conversation and require `user_id` to own it.
    async fn owned_conversation(
        &self,
        user_id: Uuid,
        conversation_id: &Uuid,
    ) -> Result<Conversation, ChatError> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or(ChatError::NotFound)?;
        if conversation.owner_id != user_id {
            warn!(
                conversation_id = %conversation_id,
                user_id = %user_id,
                "access denied: requester does not own conversation"
            );
            return Err(ChatError::AccessDenied);
        }
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parlance_types::chat::GenerationParams;
    use parlance_types::error::{GenerateError, StoreError};

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DEADLINE: Duration = Duration::from_secs(30);

    /// Map-backed store counting mutations, so denial paths can assert that
    /// nothing was written.
    #[derive(Default)]
    struct MemStore {
        state: Mutex<MemState>,
        mutations: AtomicUsize,
    }

    #[derive(Default)]
    struct MemState {
        conversations: Vec<Conversation>,
        messages: Vec<Message>,
    }

    impl MemStore {
        fn mutation_count(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }

        fn conversation_count(&self) -> usize {
            self.state.lock().unwrap().conversations.len()
        }
    }

    impl ConversationStore for MemStore {
        async fn create_conversation(
            &self,
            owner_id: Uuid,
            title: &str,
        ) -> Result<Conversation, StoreError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            let now = Utc::now();
            let conversation = Conversation {
                id: Uuid::now_v7(),
                owner_id,
                title: title.to_string(),
                created_at: now,
                updated_at: now,
            };
            self.state
                .lock()
                .unwrap()
                .conversations
                .push(conversation.clone());
            Ok(conversation)
        }

        async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state.conversations.iter().find(|c| c.id == *id).cloned())
        }

        async fn list_conversations(
            &self,
            owner_id: &Uuid,
        ) -> Result<Vec<Conversation>, StoreError> {
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
            self.mutations.fetch_add(1, Ordering::SeqCst);
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
            self.mutations.fetch_add(1, Ordering::SeqCst);
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
            self.mutations.fetch_add(1, Ordering::SeqCst);
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

    /// Generator recording each call; `reply: None` simulates failure.
    struct StubGenerator {
        reply: Option<String>,
        calls: Mutex<Vec<(String, GenerationParams, Duration)>>,
    }

    impl StubGenerator {
        fn answering(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for StubGenerator {
        async fn generate(
            &self,
            prompt: &str,
            params: &GenerationParams,
            deadline: Duration,
        ) -> Result<String, GenerateError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), *params, deadline));
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(GenerateError::Remote {
                    status: 500,
                    message: "model exploded".to_string(),
                }),
            }
        }
    }

    fn request(conversation_id: Option<Uuid>, message: &str) -> ChatRequest {
        ChatRequest {
            conversation_id,
            message: message.to_string(),
            temperature: None,
            max_new_tokens: None,
            top_k: None,
        }
    }

    #[tokio::test]
    async fn chat_creates_conversation_and_persists_both_turns() {
        let service = ChatService::new(MemStore::default(), StubGenerator::answering("Hi there!"));
        let user = Uuid::now_v7();

        let reply = service
            .chat(user, &request(None, "Hello"), DEADLINE)
            .await
            .unwrap();
        assert_eq!(reply.message, "Hi there!");
        assert_eq!(reply.role, MessageRole::Assistant);

        let conversations = service.conversations(user).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].title, "Hello");
        assert_eq!(conversations[0].id, reply.conversation_id);

        let history = service.history(user, &reply.conversation_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "Hello");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "Hi there!");
    }

    #[tokio::test]
    async fn chat_continues_existing_conversation_without_retitling() {
        let service = ChatService::new(MemStore::default(), StubGenerator::answering("ok"));
        let user = Uuid::now_v7();

        let first = service
            .chat(user, &request(None, "First question"), DEADLINE)
            .await
            .unwrap();
        service
            .chat(
                user,
                &request(Some(first.conversation_id), "Second question"),
                DEADLINE,
            )
            .await
            .unwrap();

        let conversations = service.conversations(user).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].title, "First question");
        let history = service.history(user, &first.conversation_id).await.unwrap();
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn chat_denies_foreign_conversation_without_mutating() {
        let service = ChatService::new(MemStore::default(), StubGenerator::answering("ok"));
        let owner = Uuid::now_v7();
        let intruder = Uuid::now_v7();

        let reply = service
            .chat(owner, &request(None, "mine"), DEADLINE)
            .await
            .unwrap();
        let mutations_before = service.store().mutation_count();

        let err = service
            .chat(
                intruder,
                &request(Some(reply.conversation_id), "stolen"),
                DEADLINE,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::AccessDenied));
        assert_eq!(service.store().mutation_count(), mutations_before);
    }

    #[tokio::test]
    async fn chat_unknown_conversation_is_not_found() {
        let service = ChatService::new(MemStore::default(), StubGenerator::answering("ok"));
        let err = service
            .chat(
                Uuid::now_v7(),
                &request(Some(Uuid::now_v7()), "hi"),
                DEADLINE,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound));
    }

    #[tokio::test]
    async fn generation_failure_keeps_user_message_only() {
        let service = ChatService::new(MemStore::default(), StubGenerator::failing());
        let user = Uuid::now_v7();

        let err = service
            .chat(user, &request(None, "Hello"), DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));

        let conversations = service.conversations(user).await.unwrap();
        assert_eq!(conversations.len(), 1);
        let history = service
            .history(user, &conversations[0].id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn chat_sends_transcript_prompt_and_resolved_params() {
        let generator = StubGenerator::answering("fine");
        let service = ChatService::new(MemStore::default(), generator);
        let user = Uuid::now_v7();

        let mut req = request(None, "Hello");
        req.temperature = Some(0.9);
        service.chat(user, &req, DEADLINE).await.unwrap();

        let calls = service.generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (prompt, params, deadline) = &calls[0];
        assert_eq!(prompt, "user: Hello\nassistant: ");
        assert!((params.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(params.max_new_tokens, 500);
        assert_eq!(params.top_k, 40);
        assert_eq!(*deadline, DEADLINE);
    }

    #[tokio::test]
    async fn history_requires_ownership() {
        let service = ChatService::new(MemStore::default(), StubGenerator::answering("ok"));
        let owner = Uuid::now_v7();
        let reply = service
            .chat(owner, &request(None, "secret"), DEADLINE)
            .await
            .unwrap();

        let err = service
            .history(Uuid::now_v7(), &reply.conversation_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::AccessDenied));
    }

    #[tokio::test]
    async fn rename_and_delete_require_ownership() {
        let service = ChatService::new(MemStore::default(), StubGenerator::answering("ok"));
        let owner = Uuid::now_v7();
        let intruder = Uuid::now_v7();
        let reply = service
            .chat(owner, &request(None, "keep me"), DEADLINE)
            .await
            .unwrap();

        let err = service
            .rename(intruder, &reply.conversation_id, "hijacked")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::AccessDenied));
        let err = service
            .delete(intruder, &reply.conversation_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::AccessDenied));

        service
            .rename(owner, &reply.conversation_id, "renamed")
            .await
            .unwrap();
        let conversations = service.conversations(owner).await.unwrap();
        assert_eq!(conversations[0].title, "renamed");

        service.delete(owner, &reply.conversation_id).await.unwrap();
        assert!(service.conversations(owner).await.unwrap().is_empty());
    }
}
