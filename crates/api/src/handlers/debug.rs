use axum::extract::State;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/debug/keys
///
/// Ids of all results currently held in the store.
pub async fn list_result_keys(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let mut keys = state.store.keys().await?;
    keys.sort();

    tracing::debug!(count = keys.len(), "Listed result keys");
    Ok(Json(DataResponse { data: keys }))
}
