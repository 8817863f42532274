use std::sync::Arc;

use review_db::{PgResultStore, PgWorkQueue};
use review_events::PgCompletionBus;
use review_worker::{ClauseSummaryProcessor, Worker, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env().expect("Invalid worker configuration");
    tracing::info!(worker = %config.name, channel = %config.completion_channel, "Loaded worker configuration");

    let pool = review_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    review_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let worker = Worker::new(
        Arc::new(PgWorkQueue::new(pool.clone(), config.job_lease())),
        Arc::new(PgResultStore::new(pool.clone())),
        Arc::new(PgCompletionBus::new(pool, config.completion_channel.clone())),
        Arc::new(ClauseSummaryProcessor),
        config.settings(),
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received SIGINT (Ctrl-C), stopping worker");
                signal_cancel.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install Ctrl-C handler"),
        }
    });

    worker.run(cancel).await;
    tracing::info!("Worker stopped");
}
