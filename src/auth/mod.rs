mod middleware;
mod psk;
mod session;

pub use middleware::{
    session_token_from, staff_auth_middleware, StaffAuthState, STAFF_SESSION_COOKIE,
};
pub use psk::{constant_time_eq, hash_psk, verify_psk};
pub use session::{generate_session_token, AuthRateLimiter, SessionManager};
