//! Route definitions for the race resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::race;
use crate::state::AppState;

/// Routes mounted at `/api`.
///
/// ```text
/// GET, OPTIONS   /game-state      -> get_game_state
/// POST, OPTIONS  /submit-answer   -> submit_answer
/// POST, OPTIONS  /update-horse    -> update_horse
/// POST, OPTIONS  /reset-race      -> reset_race
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/game-state",
            get(race::get_game_state).options(race::preflight),
        )
        .route(
            "/submit-answer",
            post(race::submit_answer).options(race::preflight),
        )
        .route(
            "/update-horse",
            post(race::update_horse).options(race::preflight),
        )
        .route(
            "/reset-race",
            post(race::reset_race).options(race::preflight),
        )
}
