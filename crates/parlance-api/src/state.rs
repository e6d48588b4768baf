//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the CLI commands,
//! the REST handlers, and the WebSocket session pump. The chat service is
//! generic over store and generator traits; AppState pins it to the
//! configured infra implementations behind a type-erased store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parlance_core::chat::service::ChatService;
use parlance_core::store::{BoxConversationStore, CachedStore};
use parlance_infra::cache::InMemoryCache;
use parlance_infra::config::{load_config, resolve_data_dir, resolve_database_path};
use parlance_infra::generate::HttpTextGenerator;
use parlance_infra::memory::MemoryConversationStore;
use parlance_infra::sqlite::pool::{DatabasePool, database_url};
use parlance_infra::sqlite::{SqliteConversationStore, SqliteUserStore};
use parlance_types::config::{AppConfig, StorageBackend};

/// Concrete type alias for the chat service pinned to infra implementations.
///
/// The store is boxed because the backend (cached SQLite or plain in-memory)
/// is selected from configuration at startup.
pub type ConcreteChatService = ChatService<BoxConversationStore, HttpTextGenerator>;

/// Shared application state holding all services.
///
/// Used by CLI commands, REST handlers, and WebSocket sessions.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub user_store: Arc<SqliteUserStore>,
    pub config: AppConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        // Users always live in SQLite, whichever conversation backend is
        // selected; tokens must survive a restart.
        let db_path = resolve_database_path(&config, &data_dir);
        let db_pool = DatabasePool::new(&database_url(&db_path)).await?;
        let user_store = SqliteUserStore::new(db_pool.clone());

        let store = match config.storage.backend {
            StorageBackend::Sqlite => {
                tracing::info!(path = %db_path.display(), "using sqlite conversation store");
                BoxConversationStore::new(CachedStore::new(
                    SqliteConversationStore::new(db_pool.clone()),
                    InMemoryCache::new(),
                    Duration::from_secs(config.cache.ttl_secs),
                ))
            }
            StorageBackend::Memory => {
                tracing::info!("using in-memory conversation store; state is lost on restart");
                BoxConversationStore::new(MemoryConversationStore::new())
            }
        };

        let generator = HttpTextGenerator::new(&config.generation);
        let chat_service = ChatService::new(store, generator);

        Ok(Self {
            chat_service: Arc::new(chat_service),
            user_store: Arc::new(user_store),
            config,
            data_dir,
        })
    }
}
