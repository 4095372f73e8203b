use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Generate a secure random session token (64 hex characters)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// An active staff session
struct StaffSession {
    expires_at: DateTime<Utc>,
}

/// In-memory manager for staff console sessions
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, StaffSession>>>,
    timeout_seconds: u64,
}

impl SessionManager {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            timeout_seconds,
        }
    }

    /// Create a new session and return its token
    pub fn create_session(&self) -> String {
        let token = generate_session_token();
        let expires_at = Utc::now() + Duration::seconds(self.timeout_seconds as i64);
        self.sessions
            .write()
            .insert(token.clone(), StaffSession { expires_at });
        token
    }

    /// Whether a token names a live, unexpired session
    pub fn validate_token(&self, token: &str) -> bool {
        let sessions = self.sessions.read();
        sessions
            .get(token)
            .map(|s| Utc::now() < s.expires_at)
            .unwrap_or(false)
    }

    /// Revoke a session
    pub fn revoke_session(&self, token: &str) {
        self.sessions.write().remove(token);
    }

    /// Remove expired sessions; returns how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Rate limiter for authentication attempts.
/// Sliding window of failed attempts per client IP.
pub struct AuthRateLimiter {
    attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
    max_attempts: u32,
    window_seconds: i64,
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, window_seconds: i64) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_attempts,
            window_seconds,
        }
    }

    /// Record a failed attempt; returns true if the IP is now limited
    pub fn record_failure(&self, ip: IpAddr) -> bool {
        let now = Utc::now();
        let window_start = now - Duration::seconds(self.window_seconds);

        let mut attempts = self.attempts.write();
        let ip_attempts = attempts.entry(ip).or_default();
        ip_attempts.retain(|ts| *ts > window_start);
        ip_attempts.push(now);
        ip_attempts.len() as u32 >= self.max_attempts
    }

    pub fn is_rate_limited(&self, ip: IpAddr) -> bool {
        let window_start = Utc::now() - Duration::seconds(self.window_seconds);
        let attempts = self.attempts.read();
        attempts
            .get(&ip)
            .map(|a| a.iter().filter(|ts| **ts > window_start).count() as u32 >= self.max_attempts)
            .unwrap_or(false)
    }

    /// Clear the counter for an IP (call on successful login)
    pub fn clear(&self, ip: IpAddr) {
        self.attempts.write().remove(&ip);
    }

    /// Drop IPs with no recent attempts; returns how many were removed
    pub fn cleanup(&self) -> usize {
        let window_start = Utc::now() - Duration::seconds(self.window_seconds);
        let mut attempts = self.attempts.write();
        let before = attempts.len();
        attempts.retain(|_, ip_attempts| {
            ip_attempts.retain(|ts| *ts > window_start);
            !ip_attempts.is_empty()
        });
        before - attempts.len()
    }
}

impl Clone for AuthRateLimiter {
    fn clone(&self) -> Self {
        Self {
            attempts: Arc::clone(&self.attempts),
            max_attempts: self.max_attempts,
            window_seconds: self.window_seconds,
        }
    }
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        // 5 failed attempts per minute
        Self::new(5, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_validate_session() {
        let manager = SessionManager::new(3600);
        let token = manager.create_session();

        assert!(manager.validate_token(&token));
        assert!(!manager.validate_token("invalid_token"));
    }

    #[test]
    fn test_revoke_session() {
        let manager = SessionManager::new(3600);
        let token = manager.create_session();
        assert!(manager.validate_token(&token));

        manager.revoke_session(&token);
        assert!(!manager.validate_token(&token));
    }

    #[test]
    fn test_expired_session_rejected_and_cleaned() {
        let manager = SessionManager::new(0);
        let token = manager.create_session();
        assert!(!manager.validate_token(&token));
        assert_eq!(manager.cleanup_expired(), 1);
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn test_session_token_format() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_rate_limiter_window() {
        let limiter = AuthRateLimiter::new(3, 60);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        assert!(!limiter.record_failure(ip));
        assert!(!limiter.record_failure(ip));
        assert!(limiter.record_failure(ip));
        assert!(limiter.is_rate_limited(ip));

        // Another IP is unaffected
        let other: IpAddr = "192.168.1.2".parse().unwrap();
        assert!(!limiter.is_rate_limited(other));

        limiter.clear(ip);
        assert!(!limiter.is_rate_limited(ip));
    }
}
