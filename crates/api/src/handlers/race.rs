//! Handlers for the race endpoints under `/api`.
//!
//! Reads go straight to the store. Mutations go through the store, then
//! the returned snapshot is pushed to viewers. Answer submissions are handed
//! to the pipeline and acknowledged before judging starts.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use derby_core::types::HorseId;
use derby_core::validation::{validate_horse_name, validate_model_value};
use derby_core::{AnswerStatus, RaceState};
use serde::{Deserialize, Serialize};

use crate::engine::{Submission, SubmissionOutcome};
use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `POST /api/submit-answer`.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// Run the pipeline inline and return the verdict instead of `202`.
    #[serde(default)]
    pub wait: bool,
}

/// Body of a synchronous submission response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub approved: bool,
    pub answer: String,
}

impl From<SubmissionOutcome> for SubmitAnswerResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Judged(answer) => Self {
                approved: answer.status == AnswerStatus::Approved,
                answer: answer.content,
            },
            SubmissionOutcome::Skipped(_) | SubmissionOutcome::Cancelled => Self {
                approved: false,
                answer: String::new(),
            },
        }
    }
}

/// Body of `POST /api/update-horse`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHorseRequest {
    pub horse_id: HorseId,
    pub name: String,
    pub model_value: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/game-state
pub async fn get_game_state(State(state): State<AppState>) -> Json<RaceState> {
    Json(state.store.snapshot().await)
}

/// POST /api/submit-answer
///
/// Returns `202 Accepted` once the submission is queued. With `?wait=true`
/// the response waits for the verdict and is `200 {approved, answer}`.
/// Unknown horses or questions are accepted and silently dropped.
pub async fn submit_answer(
    State(state): State<AppState>,
    params: Result<Query<SubmitParams>, QueryRejection>,
    payload: Result<Json<Submission>, JsonRejection>,
) -> AppResult<Response> {
    let Query(params) = params?;
    let Json(submission) = payload?;
    validate_model_value(&submission.model_value)?;

    tracing::info!(
        horse_id = submission.horse_id,
        question_id = %submission.question_id,
        model = %submission.model_value,
        wait = params.wait,
        "Received answer submission",
    );

    // The pipeline's tracker owns the task; dropping this request does not
    // cancel judging.
    let handle = state.pipeline.submit(submission);
    if params.wait {
        let outcome = handle.outcome().await;
        return Ok(Json(SubmitAnswerResponse::from(outcome)).into_response());
    }

    Ok(StatusCode::ACCEPTED.into_response())
}

/// POST /api/update-horse
///
/// Sets a horse's display name and model, broadcasts, and returns the new
/// snapshot.
pub async fn update_horse(
    State(state): State<AppState>,
    payload: Result<Json<UpdateHorseRequest>, JsonRejection>,
) -> AppResult<Json<RaceState>> {
    let Json(input) = payload?;
    validate_horse_name(&input.name)?;
    validate_model_value(&input.model_value)?;

    let snapshot = state
        .store
        .update_horse_profile(input.horse_id, &input.name, &input.model_value)
        .await;
    state.hub.push(&snapshot).await;

    Ok(Json(snapshot))
}

/// POST /api/reset-race
///
/// Sends every horse back to the start and clears the answer history.
pub async fn reset_race(State(state): State<AppState>) -> Json<RaceState> {
    let snapshot = state.store.reset_race().await;
    state.hub.push(&snapshot).await;
    Json(snapshot)
}

/// OPTIONS on any race endpoint: empty `200`.
///
/// Real CORS preflights are answered by the CORS layer before reaching
/// this; bare `OPTIONS` requests land here.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
