pub mod contracts;
pub mod debug;
pub mod health;
pub mod results;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /contracts/review                 submit a document (POST)
///
/// /result/{id}                      poll a result
/// /result/subscribe/{id}            live subscribe (SSE, no request timeout)
///
/// /debug/keys                       stored result ids
/// ```
///
/// `timeout` wraps every route except the live-subscribe stream, which is
/// bounded by its own deadline.
pub fn api_routes(timeout: TimeoutLayer) -> Router<AppState> {
    Router::new()
        .merge(contracts::router())
        .merge(results::router())
        .merge(debug::router())
        .layer(timeout)
        .merge(results::stream_router())
}
