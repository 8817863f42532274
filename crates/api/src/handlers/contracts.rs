//! Handlers for submitting contracts for review.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use review_core::error::CoreError;
use review_core::job::JobPayload;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::AcceptedJob;
use crate::state::AppState;

/// POST /api/v1/contracts/review
///
/// Queue a processed document for review. Returns 202 with the job id; the
/// result is fetched later by polling or live-subscribing on that id.
///
/// - 400 `BAD_REQUEST` if the body is not a JSON job payload
/// - 400 `VALIDATION_ERROR` if a field fails validation
/// - 503 `DISPATCH_FAILED` if the queue refuses the job
pub async fn submit_review(
    State(state): State<AppState>,
    payload: Result<Json<JobPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    payload
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let id = state.submitter.submit(payload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedJob { id: id.to_string() }),
    ))
}
