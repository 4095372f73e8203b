use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;

/// Check-in request: a scanned QR payload or a typed token
#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    #[serde(default)]
    pub code: String,
}

/// Successful check-in acknowledgement
#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub accepted: bool,
    pub token: String,
    pub estimated_wait_min: u32,
    pub display_name: String,
    pub message: &'static str,
}

/// Check a patient in by code.
///
/// A duplicate scan for an already-active token is rejected as
/// AlreadyCheckedIn and never creates a second encounter; manual code
/// entry hits this same handler, so a dead camera never blocks intake.
pub async fn check_in(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<CheckinRequest>,
) -> ApiResult<Json<CheckinResponse>> {
    if body.code.trim().is_empty() {
        return Err(ApiError::Validation("code is required".to_string()));
    }

    let (encounter, registration) = state.store.check_in(&body.code)?;
    let estimated_wait_min = state.wait_for(encounter.id);

    info!("Checked in {} ({})", registration.pid, encounter.token);
    state.audit.record(
        "checkin",
        json!({
            "pid": registration.pid,
            "token": encounter.token,
            "wait": estimated_wait_min,
        }),
    );
    state.publish_queue_update();

    Ok(Json(CheckinResponse {
        accepted: true,
        token: encounter.token,
        estimated_wait_min,
        display_name: registration.full_name(),
        message: "You are checked in.",
    }))
}
