pub mod health;
pub mod race;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /game-state                  current race snapshot (GET)
/// /submit-answer               queue an answer for judging (POST)
/// /update-horse                set a horse's name and model (POST)
/// /reset-race                  start a new race (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(race::router())
}

/// Routes mounted at the root for live viewers.
///
/// ```text
/// /ws                          WebSocket race feed
/// ```
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws::ws_handler))
}
