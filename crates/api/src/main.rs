use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use review_api::backends::Backends;
use review_api::background;
use review_api::config::ServerConfig;
use review_api::router::build_app_router;
use review_api::shutdown;
use review_api::state::AppState;
use review_events::{CompletionBus, CompletionHandler, CompletionListener};
use review_worker::{ClauseSummaryProcessor, Worker, WorkerSettings};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Poll interval for the in-process worker.
const EMBEDDED_WORKER_POLL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_api=debug,review_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        durable = config.database_url.is_some(),
        embedded_worker = config.embedded_worker,
        "Loaded server configuration"
    );

    // --- Backends ---
    let backends = Backends::from_config(&config)
        .await
        .expect("Failed to initialize backends");
    if config.database_url.is_none() && !config.embedded_worker {
        tracing::warn!("In-memory backends without an embedded worker: jobs will never complete");
    }

    let state = AppState::new(config.clone(), &backends);
    let cancel = CancellationToken::new();

    // --- Completion listener ---
    let completions = backends
        .bus
        .subscribe()
        .await
        .expect("Failed to subscribe to completion bus");
    let handler: Arc<dyn CompletionHandler> = state.coordinator.clone();
    let listener_handle = tokio::spawn(CompletionListener::run(
        completions,
        handler,
        cancel.clone(),
    ));

    // --- Result purge ---
    let purge_handle = tokio::spawn(background::result_purge::run(
        Arc::clone(&backends.store),
        config.result_purge_interval(),
        cancel.clone(),
    ));

    // --- Embedded worker ---
    let worker_handle = config.embedded_worker.then(|| {
        let worker = Worker::new(
            Arc::clone(&backends.queue),
            Arc::clone(&backends.store),
            Arc::clone(&backends.bus),
            Arc::new(ClauseSummaryProcessor),
            WorkerSettings {
                name: format!("api-embedded-{}", std::process::id()),
                result_ttl: config.result_ttl(),
                poll_interval: EMBEDDED_WORKER_POLL,
            },
        );
        let cancel = cancel.clone();
        tracing::info!("Embedded worker started");
        tokio::spawn(async move { worker.run(cancel).await })
    });

    // --- Start server ---
    let coordinator = Arc::clone(&state.coordinator);
    let app = build_app_router(state, &config);
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::graceful(shutdown_signal(), coordinator))
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    cancel.cancel();

    let grace = config.shutdown_timeout();
    if let Some(handle) = worker_handle {
        let _ = tokio::time::timeout(grace, handle).await;
        tracing::info!("Embedded worker stopped");
    }
    let _ = tokio::time::timeout(grace, listener_handle).await;
    let _ = tokio::time::timeout(grace, purge_handle).await;
    tracing::info!("Background tasks stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
