#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use review_api::backends::Backends;
use review_api::config::ServerConfig;
use review_api::router::build_app_router;
use review_api::state::AppState;
use review_core::completion::CompletionEvent;
use review_core::job::{Clause, JobPayload};
use review_core::result::ResultRecord;
use review_core::store::ResultStore;
use review_core::types::JobId;
use review_events::{CompletionBus, CompletionHandler, CompletionListener};
use review_worker::{ClauseSummaryProcessor, Worker, WorkerSettings};

pub const RESULT_TTL: Duration = Duration::from_secs(1800);

/// Build a test `ServerConfig` with safe defaults and in-memory backends.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        result_ttl_secs: RESULT_TTL.as_secs(),
        subscribe_timeout_secs: 900,
        completion_channel: "contract_results".to_string(),
        embedded_worker: false,
        result_purge_interval_secs: 300,
        job_lease_secs: 60,
    }
}

/// A running application: router plus the backends behind it.
///
/// The completion listener (and optionally a worker) run as background
/// tasks until the `TestApp` is dropped.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backends: Backends,
    cancel: CancellationToken,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(test_config(), Backends::in_memory(&test_config())).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let backends = Backends::in_memory(&config);
        Self::with(config, backends).await
    }

    pub async fn with(config: ServerConfig, backends: Backends) -> Self {
        let state = AppState::new(config.clone(), &backends);
        let cancel = CancellationToken::new();

        let completions = backends.bus.subscribe().await.unwrap();
        let handler: Arc<dyn CompletionHandler> = state.coordinator.clone();
        tokio::spawn(CompletionListener::run(completions, handler, cancel.clone()));

        let router = build_app_router(state.clone(), &config);
        Self {
            router,
            state,
            backends,
            cancel,
        }
    }

    /// Start a worker sharing this app's backends.
    pub fn spawn_worker(&self) {
        let worker = Worker::new(
            Arc::clone(&self.backends.queue),
            Arc::clone(&self.backends.store),
            Arc::clone(&self.backends.bus),
            Arc::new(ClauseSummaryProcessor),
            WorkerSettings {
                name: "test-worker".into(),
                result_ttl: RESULT_TTL,
                poll_interval: Duration::from_millis(20),
            },
        );
        let cancel = self.cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await });
    }

    /// Do what a worker does on completion: store, then announce.
    pub async fn complete(&self, record: ResultRecord) {
        self.backends.store.put_record(&record, RESULT_TTL).await.unwrap();
        let event = CompletionEvent::for_record(&record).unwrap();
        self.backends.bus.publish(&event).await.unwrap();
    }

    pub fn pending_subscriptions(&self) -> usize {
        self.state.coordinator.registry().len()
    }

    /// Wait until a subscription for `id` is registered.
    pub async fn wait_for_subscriber(&self, id: JobId) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.state.coordinator.registry().contains(id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriber never registered");
    }

    pub async fn get(&self, uri: &str) -> Response {
        get(self.router.clone(), uri).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response {
        post_json(self.router.clone(), uri, body).await
    }
}

pub fn sample_payload() -> JobPayload {
    JobPayload {
        file_name: "services-agreement.pdf".into(),
        extracted_text: "Services Agreement. Payment is due in 30 days.".into(),
        header: Some("Services Agreement".into()),
        clauses: vec![Clause {
            index: 1,
            text: "Payment is due in 30 days.".into(),
        }],
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Submit the sample payload and return the accepted job id.
pub async fn submit(app: &TestApp) -> JobId {
    let response = app
        .post_json("/api/v1/contracts/review", serde_json::to_value(sample_payload()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["id"].as_str().unwrap().parse().unwrap()
}

/// One parsed Server-Sent Event.
#[derive(Debug, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: serde_json::Value,
}

/// Parse the named events out of an SSE body, ignoring keep-alive comments.
pub fn parse_sse(body: &str) -> Vec<SseEvent> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim_start().to_string());
                } else if let Some(raw) = line.strip_prefix("data:") {
                    let raw = raw.trim_start();
                    data = Some(
                        serde_json::from_str(raw)
                            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string())),
                    );
                }
            }
            Some(SseEvent {
                event: event?,
                data: data.unwrap_or(serde_json::Value::Null),
            })
        })
        .collect()
}
