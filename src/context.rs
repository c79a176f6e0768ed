/// Application context and dependency injection
use crate::{
    categories::CategoryManager,
    config::AppConfig,
    db,
    error::ModerationResult,
    moderation::{
        Clock, DispatchWindow, ModerationScheduler, ModerationStore, SqliteModerationStore,
        SystemClock,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: SqlitePool,
    pub clock: Arc<dyn Clock>,
    pub moderation_store: Arc<dyn ModerationStore>,
    pub scheduler: Arc<ModerationScheduler>,
    pub category_manager: Arc<CategoryManager>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: AppConfig) -> ModerationResult<Self> {
        // Validate configuration
        config.validate()?;

        let db = db::create_pool(
            &config.storage.database,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        tracing::info!(database = ?config.storage.database, "database ready");

        Self::from_parts(config, db, Arc::new(SystemClock))
    }

    /// Wire services over an existing pool and clock
    pub fn from_parts(
        config: AppConfig,
        db: SqlitePool,
        clock: Arc<dyn Clock>,
    ) -> ModerationResult<Self> {
        let window = DispatchWindow::from_config(&config.dispatch)?;

        let moderation_store: Arc<dyn ModerationStore> =
            Arc::new(SqliteModerationStore::new(db.clone()));
        let scheduler = Arc::new(ModerationScheduler::new(
            Arc::clone(&moderation_store),
            Arc::clone(&clock),
            window,
        ));
        let category_manager = Arc::new(CategoryManager::new(db.clone(), Arc::clone(&clock)));

        Ok(Self {
            config: Arc::new(config),
            db,
            clock,
            moderation_store,
            scheduler,
            category_manager,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
