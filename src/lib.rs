pub mod auth;
pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod realtime;
pub mod state;
pub mod store;
pub mod triage;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::ServerState;
