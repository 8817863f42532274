use axum::routing::get;
use axum::Router;

use crate::handlers::debug;
use crate::state::AppState;

/// ```text
/// GET    /debug/keys              -> list_result_keys
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/debug/keys", get(debug::list_result_keys))
}
