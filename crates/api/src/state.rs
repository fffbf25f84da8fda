use std::sync::Arc;

use derby_core::RaceStore;

use crate::config::ServerConfig;
use crate::engine::AnswerPipeline;
use crate::ws::BroadcastHub;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The single owner of the live race state.
    pub store: Arc<RaceStore>,
    /// Live viewer connections.
    pub hub: Arc<BroadcastHub>,
    /// Background answer processing.
    pub pipeline: AnswerPipeline,
}
