//! Selection of the work queue, result store and completion bus.

use std::sync::Arc;

use review_core::queue::{MemoryWorkQueue, WorkQueue};
use review_core::store::{MemoryResultStore, ResultStore};
use review_db::{PgResultStore, PgWorkQueue};
use review_events::{CompletionBus, LocalCompletionBus, PgCompletionBus};

use crate::config::ServerConfig;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// The three shared infrastructure handles.
#[derive(Clone)]
pub struct Backends {
    pub queue: Arc<dyn WorkQueue>,
    pub store: Arc<dyn ResultStore>,
    pub bus: Arc<dyn CompletionBus>,
}

impl Backends {
    /// Process-local backends. Workers must run in the same process.
    pub fn in_memory(config: &ServerConfig) -> Self {
        Self {
            queue: Arc::new(MemoryWorkQueue::new(config.job_lease())),
            store: Arc::new(MemoryResultStore::new()),
            bus: Arc::new(LocalCompletionBus::default()),
        }
    }

    /// PostgreSQL-backed queue, store and `LISTEN/NOTIFY` bus.
    pub async fn postgres(config: &ServerConfig, database_url: &str) -> Result<Self, BackendError> {
        let pool = review_db::create_pool(database_url).await?;
        review_db::health_check(&pool).await?;
        tracing::info!("Database health check passed");

        review_db::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self {
            queue: Arc::new(PgWorkQueue::new(pool.clone(), config.job_lease())),
            store: Arc::new(PgResultStore::new(pool.clone())),
            bus: Arc::new(PgCompletionBus::new(pool, config.completion_channel.clone())),
        })
    }

    /// Pick backends from configuration.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, BackendError> {
        match config.database_url.as_deref() {
            Some(url) => Self::postgres(config, url).await,
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory backends");
                Ok(Self::in_memory(config))
            }
        }
    }
}
