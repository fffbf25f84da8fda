use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Connected WebSocket viewers.
    pub viewers: usize,
    /// Submissions still being judged.
    pub in_flight: usize,
    /// Whether a judge API key is configured. Without one every answer is
    /// rejected.
    pub judge_configured: bool,
}

/// GET /health -- returns service status and live counters.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let judge_configured = state.config.judge.api_key.is_some();
    let status = if judge_configured { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        viewers: state.hub.connection_count().await,
        in_flight: state.pipeline.in_flight(),
        judge_configured,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
