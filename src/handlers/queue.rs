use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiResult;
use crate::queue::{lobby_load, staff_view, LobbyLoad, QueuePayload, StaffQueueResponse};
use crate::state::ServerState;
use crate::store::{AuditEvent, EncounterStatus};

/// Public queue view: privacy-filtered, same payload the websocket pushes
pub async fn public_queue(State(state): State<Arc<ServerState>>) -> Json<QueuePayload> {
    Json(state.queue_payload())
}

/// Coarse lobby pressure for the entrance display
pub async fn lobby_load_view(State(state): State<Arc<ServerState>>) -> Json<LobbyLoad> {
    Json(lobby_load(state.store.active_count()))
}

/// Staff queue view with clinical fields and aggregates
pub async fn staff_queue(State(state): State<Arc<ServerState>>) -> Json<StaffQueueResponse> {
    let scheduled = state.scheduled_queue();
    let encounters: Vec<_> = scheduled.iter().map(|s| s.encounter.clone()).collect();
    let registrations = state.store.registrations_for(&encounters);
    Json(staff_view(&scheduled, &registrations, state.store.providers()))
}

/// Status transition request
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub patient_ref: String,
    pub status: String,
}

/// Status transition acknowledgement
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub token: String,
    pub status: EncounterStatus,
}

/// Advance an encounter along the visit lifecycle
pub async fn set_status(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let new_status: EncounterStatus = body.status.parse()?;
    let encounter = state.store.transition(&body.patient_ref, new_status)?;

    info!("Encounter {} -> {}", encounter.token, new_status);
    state.audit.record(
        "status_change",
        json!({"token": encounter.token, "status": new_status.to_string()}),
    );
    state.publish_queue_update();

    Ok(Json(StatusResponse {
        token: encounter.token,
        status: new_status,
    }))
}

/// Provider count view
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub provider_count: u32,
}

/// Provider count update
#[derive(Debug, Deserialize)]
pub struct ProvidersRequest {
    pub count: u32,
}

pub async fn get_providers(State(state): State<Arc<ServerState>>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        provider_count: state.store.providers(),
    })
}

/// Set the number of providers on shift. Zero is allowed: the scheduler
/// degrades to a single-provider estimate rather than dividing by it.
pub async fn set_providers(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<ProvidersRequest>,
) -> ApiResult<Json<ProvidersResponse>> {
    let provider_count = state.store.set_providers(body.count);

    state
        .audit
        .record("provider_count_change", json!({"provider_count": provider_count}));
    state.publish_queue_update();

    Ok(Json(ProvidersResponse { provider_count }))
}

/// Audit tail response
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub count: usize,
    pub events: Vec<AuditEvent>,
}

/// Recent operational events, oldest first
pub async fn audit_tail(State(state): State<Arc<ServerState>>) -> Json<AuditResponse> {
    let events = state.audit.tail();
    Json(AuditResponse {
        count: events.len(),
        events,
    })
}
