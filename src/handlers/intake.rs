use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::camera::render_qr_png;
use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;
use crate::store::{ArrivalWindow, IntakeData};

/// Intake form body
#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default = "default_duration")]
    pub duration_text: String,
    #[serde(default)]
    pub arrival_window: String,
}

fn default_duration() -> String {
    "1 day".to_string()
}

/// Intake acknowledgement
#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub pid: String,
    pub token: String,
    pub qr_url: String,
}

/// Register a new patient and issue their check-in token
pub async fn submit_intake(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<IntakeRequest>,
) -> ApiResult<Json<IntakeResponse>> {
    let first_name = body.first_name.trim().to_string();
    let symptoms = body.symptoms.trim().to_string();
    if first_name.is_empty() || symptoms.is_empty() {
        return Err(ApiError::Validation(
            "First name and symptoms are required".to_string(),
        ));
    }
    validate_dob(body.dob.trim())?;

    let registration = state.store.register(IntakeData {
        first_name,
        last_name: body.last_name.trim().to_string(),
        phone: body.phone.trim().to_string(),
        dob: body.dob.trim().to_string(),
        symptom_text: symptoms,
        duration_text: body.duration_text,
        arrival_window: ArrivalWindow::parse(&body.arrival_window),
    });

    info!("Registered intake {} ({})", registration.pid, registration.token);
    state.audit.record(
        "intake_created",
        json!({"pid": registration.pid, "token": registration.token}),
    );

    Ok(Json(IntakeResponse {
        qr_url: format!("/api/qr/{}", registration.pid),
        pid: registration.pid,
        token: registration.token,
    }))
}

/// Render the check-in QR for a registration as PNG
pub async fn qr_image(
    State(state): State<Arc<ServerState>>,
    Path(pid): Path<String>,
) -> ApiResult<Response> {
    let registration = state.store.get_registration(&pid)?;
    let payload = format!("{}|{}", registration.pid, registration.token);
    let png =
        render_qr_png(&payload).map_err(|e| ApiError::Internal(format!("QR render: {e}")))?;

    Response::builder()
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(png))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// DOB is optional, but when present it must be a plausible date
fn validate_dob(dob: &str) -> ApiResult<()> {
    if dob.is_empty() {
        return Ok(());
    }
    let parsed = NaiveDate::parse_from_str(dob, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation("DOB must be YYYY-MM-DD".to_string()))?;
    if parsed > Utc::now().date_naive() {
        return Err(ApiError::Validation(
            "DOB cannot be in the future".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dob() {
        assert!(validate_dob("").is_ok());
        assert!(validate_dob("1987-04-12").is_ok());
        assert!(validate_dob("12/04/1987").is_err());
        assert!(validate_dob("3099-01-01").is_err());
    }
}
