use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{session_token_from, STAFF_SESSION_COOKIE};
use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;

/// Staff login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// Staff login acknowledgement; the session rides a cookie
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
}

/// Authenticate a staff member against the pre-shared key.
/// Failed attempts are rate limited per client IP.
pub async fn staff_login(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Response> {
    let ip = addr.ip();
    if state.auth.rate_limiter.is_rate_limited(ip) {
        warn!("Rate limited staff login from {ip}");
        return Err(ApiError::RateLimited);
    }

    if !state.auth.verify_password(&body.password) {
        if state.auth.rate_limiter.record_failure(ip) {
            warn!("IP {ip} is now rate limited after failed staff logins");
        }
        return Err(ApiError::Unauthorized);
    }
    state.auth.rate_limiter.clear(ip);

    let token = state.auth.session_manager.create_session();
    info!("Staff login from {ip}");
    state.audit.record("staff_login", json!({"ip": ip.to_string()}));

    let cookie = format!(
        "{STAFF_SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.session_timeout_seconds
    );
    let mut response = Json(LoginResponse { ok: true }).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| ApiError::Internal("cookie encoding".to_string()))?,
    );
    Ok(response)
}

/// Revoke the calling session and clear its cookie
pub async fn staff_logout(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if let Some(token) = session_token_from(&headers) {
        state.auth.session_manager.revoke_session(&token);
    }

    let clear = format!("{STAFF_SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    let mut response = Json(LoginResponse { ok: true }).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        clear
            .parse()
            .map_err(|_| ApiError::Internal("cookie encoding".to_string()))?,
    );
    Ok(response)
}
