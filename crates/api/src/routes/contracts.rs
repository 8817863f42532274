use axum::routing::post;
use axum::Router;

use crate::handlers::contracts;
use crate::state::AppState;

/// ```text
/// POST   /contracts/review        -> submit_review
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/contracts/review", post(contracts::submit_review))
}
