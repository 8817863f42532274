//! Route definitions for job results.

use axum::routing::get;
use axum::Router;

use crate::handlers::results;
use crate::state::AppState;

/// ```text
/// GET    /result/{id}             -> get_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/result/{id}", get(results::get_result))
}

/// Long-lived streaming routes, mounted outside the request timeout.
///
/// ```text
/// GET    /result/subscribe/{id}   -> subscribe_result
/// ```
pub fn stream_router() -> Router<AppState> {
    Router::new().route("/result/subscribe/{id}", get(results::subscribe_result))
}
