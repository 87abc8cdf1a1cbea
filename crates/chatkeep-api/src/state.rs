//! Application state wiring the chat service together.
//!
//! `ChatService` is generic over its repository and backend; AppState pins
//! it to the SQLite repository and the Gemini backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use chatkeep_core::chat::service::ChatService;
use chatkeep_infra::llm::gemini::GeminiBackend;
use chatkeep_infra::llm::gemini::client::API_KEY_ENV;
use chatkeep_infra::sqlite::pool::{DatabasePool, database_url_in};
use chatkeep_infra::sqlite::session::SqliteSessionRepository;
use chatkeep_types::config::GlobalConfig;

/// Concrete chat service pinned to infra implementations.
pub type ConcreteChatService = ChatService<SqliteSessionRepository, GeminiBackend>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Connect to the database and the Gemini backend, then wire the service.
    pub async fn init(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        let db_pool = open_database(&data_dir, &config).await?;
        let backend = GeminiBackend::from_env(&config.llm)
            .with_context(|| format!("{API_KEY_ENV} must be set to reach the Gemini API"))?;

        tracing::info!(model = %backend.model(), "Chat backend ready");

        let repo = SqliteSessionRepository::new(db_pool);
        let chat_service = ChatService::new(repo, backend, config.chat.clone());

        Ok(Self {
            chat_service: Arc::new(chat_service),
            config: Arc::new(config),
            data_dir,
        })
    }
}

/// Open (creating and migrating if needed) the session database.
///
/// Uses `database_url` from the config when set, otherwise
/// `{data_dir}/chatkeep.db`.
pub async fn open_database(data_dir: &Path, config: &GlobalConfig) -> anyhow::Result<DatabasePool> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let db_url = config
        .database_url
        .clone()
        .unwrap_or_else(|| format!("{}?mode=rwc", database_url_in(data_dir)));

    DatabasePool::new(&db_url)
        .await
        .with_context(|| format!("failed to open database {db_url}"))
}
