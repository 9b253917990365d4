//! Application state wiring all services together.
//!
//! AppState holds the concrete service instance used by both CLI commands
//! and REST API handlers. The service is generic over repository/embedder/
//! index traits, but AppState pins it to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use echovault_core::service::conversation::ConversationService;
use echovault_infra::config::{load_global_config, resolve_data_dir};
use echovault_infra::sqlite::conversation::SqliteConversationRepository;
use echovault_infra::sqlite::pool::DatabasePool;
use echovault_infra::vector::embedder::FastEmbedder;
use echovault_infra::vector::index::LanceContextIndex;
use echovault_infra::vector::lance::LanceVectorStore;
use echovault_types::config::GlobalConfig;

/// Concrete type alias for the service generics pinned to infra implementations.
pub type ConcreteConversationService =
    ConversationService<SqliteConversationRepository, FastEmbedder, LanceContextIndex>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub conversation_service: Arc<ConcreteConversationService>,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: connect to the stores, load the
    /// embedding model, wire the service.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;

        // Initialize database
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("echovault.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;
        let repo = SqliteConversationRepository::new(db_pool);

        // Vector store lives next to the database
        let lance_store = LanceVectorStore::new(data_dir.join("vector_store")).await?;
        let index = LanceContextIndex::new(lance_store);

        // Model load may download ONNX weights on first run
        let embedder = tokio::task::spawn_blocking(FastEmbedder::new).await??;

        let conversation_service =
            ConversationService::new(repo, embedder, index, config.context.search_limit);

        Ok(Self {
            conversation_service: Arc::new(conversation_service),
            config,
            data_dir,
        })
    }
}
