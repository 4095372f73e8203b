use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;
use crate::store::{VitalsReading, VitalsSnapshot};
use crate::triage::triage;

/// Vitals submission from the sensor bridge or a staff member.
/// The patient may be addressed by `patient_ref`, `pid`, or `token`.
#[derive(Debug, Deserialize)]
pub struct VitalsSubmitRequest {
    #[serde(default)]
    pub patient_ref: String,
    #[serde(default)]
    pub pid: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_device")]
    pub device_id: String,
    pub spo2: Option<f64>,
    pub hr: Option<f64>,
    pub temp_c: Option<f64>,
    pub bp_sys: Option<f64>,
    pub bp_dia: Option<f64>,
}

fn default_device() -> String {
    "sensors".to_string()
}

impl VitalsSubmitRequest {
    fn patient_code(&self) -> &str {
        [&self.patient_ref, &self.pid, &self.token]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }
}

/// Ingestion acknowledgement
#[derive(Debug, Serialize)]
pub struct VitalsAck {
    pub pid: String,
    pub token: String,
    pub recorded_at: DateTime<Utc>,
}

/// Attach a vitals snapshot to the patient's active encounter
pub async fn submit_vitals(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<VitalsSubmitRequest>,
) -> ApiResult<Json<VitalsAck>> {
    let code = body.patient_code();
    if code.is_empty() {
        return Err(ApiError::Validation(
            "patient_ref, pid, or token is required".to_string(),
        ));
    }

    let reading = VitalsReading {
        spo2: body.spo2,
        hr: body.hr,
        temp_c: body.temp_c,
        bp_sys: body.bp_sys,
        bp_dia: body.bp_dia,
    };
    let (encounter, recorded_at) = state.store.update_vitals(code, reading, &body.device_id)?;

    state.audit.record(
        "vitals_submit",
        json!({
            "pid": encounter.pid,
            "token": encounter.token,
            "device_id": body.device_id,
        }),
    );
    // New vitals can reprioritize the queue
    state.publish_queue_update();

    Ok(Json(VitalsAck {
        pid: encounter.pid,
        token: encounter.token,
        recorded_at,
    }))
}

/// Latest vitals response
#[derive(Debug, Serialize)]
pub struct LatestVitalsResponse {
    pub vitals: Option<VitalsSnapshot>,
}

/// Latest vitals snapshot for a patient, or null if none captured yet
pub async fn latest_vitals(
    State(state): State<Arc<ServerState>>,
    Path(patient_ref): Path<String>,
) -> ApiResult<Json<LatestVitalsResponse>> {
    let (encounter, _) = state.store.get_active(&patient_ref)?;
    Ok(Json(LatestVitalsResponse {
        vitals: encounter.vitals_latest,
    }))
}

/// Triage query response
#[derive(Debug, Serialize)]
pub struct TriageResponse {
    pub priority: crate::store::Priority,
    pub emergency: Option<String>,
    pub red_flags: Vec<String>,
    pub message: String,
    pub ai_script: String,
}

/// Run triage for a patient from their current vitals and symptoms.
/// Recomputed fresh on every call since vitals may have changed.
pub async fn triage_query(
    State(state): State<Arc<ServerState>>,
    Path(patient_ref): Path<String>,
) -> ApiResult<Json<TriageResponse>> {
    let (encounter, registration) = state.store.get_active(&patient_ref)?;

    let outcome = triage(
        encounter.vitals_latest.as_ref().map(|s| &s.reading),
        &registration.symptom_text,
    );

    Ok(Json(TriageResponse {
        priority: outcome.priority,
        emergency: outcome.emergency,
        red_flags: outcome.red_flags,
        message: outcome.message,
        ai_script: outcome.script,
    }))
}
