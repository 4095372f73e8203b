use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::ServerState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub active_encounters: usize,
    pub connected_viewers: usize,
    pub provider_count: u32,
    pub camera_live: bool,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        active_encounters: state.store.active_count(),
        connected_viewers: state.hub.viewer_count(),
        provider_count: state.store.providers(),
        camera_live: state.frame_cache.is_live(),
    })
}
