use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use crate::auth::psk::{hash_psk, verify_psk};
use crate::auth::session::{AuthRateLimiter, SessionManager};
use crate::error::ApiError;

/// Cookie carrying the staff session token
pub const STAFF_SESSION_COOKIE: &str = "carelane_staff_session";

/// Authentication state shared with middleware and the login handler
pub struct StaffAuthState {
    pub session_manager: SessionManager,
    pub rate_limiter: AuthRateLimiter,
    password_hash: String,
}

impl StaffAuthState {
    pub fn new(staff_password: &str, session_timeout_seconds: u64) -> Self {
        Self {
            session_manager: SessionManager::new(session_timeout_seconds),
            rate_limiter: AuthRateLimiter::default(),
            password_hash: hash_psk(staff_password),
        }
    }

    /// Verify the staff pre-shared key
    pub fn verify_password(&self, password: &str) -> bool {
        verify_psk(password, &self.password_hash)
    }
}

/// Pull the session token from the Authorization header or the staff
/// session cookie
pub fn session_token_from(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        let token = value.strip_prefix("Bearer ").unwrap_or(value);
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == STAFF_SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Middleware guarding staff-only routes
pub async fn staff_auth_middleware(
    State(state): State<Arc<StaffAuthState>>,
    request: Request,
    next: Next,
) -> Response {
    match session_token_from(request.headers()) {
        Some(token) if state.session_manager.validate_token(&token) => next.run(request).await,
        _ => {
            warn!("Rejected unauthenticated staff request to {}", request.uri().path());
            ApiError::Unauthorized.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_auth_state_verifies_psk() {
        let state = StaffAuthState::new("clinic-password", 3600);
        assert!(state.verify_password("clinic-password"));
        assert!(!state.verify_password("wrong"));
    }

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(session_token_from(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; carelane_staff_session=tok42; lang=en"),
        );
        assert_eq!(session_token_from(&headers).as_deref(), Some("tok42"));
    }

    #[test]
    fn test_no_token() {
        assert_eq!(session_token_from(&HeaderMap::new()), None);
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_token_from(&headers), None);
    }
}
