use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address (0.0.0.0 for LAN, 127.0.0.1 for localhost)
    pub bind_addr: String,
    /// Pre-shared staff console password
    pub staff_password: String,
    /// Staff session timeout in seconds
    pub session_timeout_seconds: u64,
    /// Number of providers on shift at startup
    pub initial_providers: u32,
    /// Average visit duration per lane, minutes (high, medium, low)
    pub avg_visit_min: LaneDurations,
    /// How long a `done` encounter is kept before eviction
    pub done_retention: Duration,
    /// Camera device path (ignored when a pipeline is set)
    pub camera_device: String,
    /// Full ffmpeg input argument string overriding the default device input
    pub camera_pipeline: Option<String>,
    /// Requested capture resolution
    pub camera_width: u32,
    pub camera_height: u32,
    /// Delay between capture cycles
    pub capture_interval: Duration,
    /// Timeout for a single frame grab
    pub capture_timeout: Duration,
    /// Age past which a decoded scan is no longer actionable
    pub scan_freshness: Duration,
    /// Window inside which an identical decode is not re-emitted
    pub scan_reemit: Duration,
    /// Delay between frames served to MJPEG viewers
    pub stream_frame_interval: Duration,
    /// Per-viewer broadcast queue capacity before the viewer is dropped
    pub viewer_queue_capacity: usize,
    /// CORS allowed origins (comma-separated in env var)
    pub cors_origins: Vec<String>,
}

/// Per-lane average visit durations in minutes
#[derive(Debug, Clone, Copy)]
pub struct LaneDurations {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl Default for LaneDurations {
    fn default() -> Self {
        Self {
            high: 20,
            medium: 25,
            low: 15,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        // Require an explicit staff password - no default credentials
        let staff_password = env::var("STAFF_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvVar("STAFF_PASSWORD".to_string()))?;
        if staff_password.len() < 8 {
            return Err(ConfigError::InvalidValue(
                "STAFF_PASSWORD must be at least 8 characters".to_string(),
            ));
        }

        Ok(Self {
            port: env::var("CARELANE_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            bind_addr: env::var("CARELANE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            staff_password,
            session_timeout_seconds: env_u64("SESSION_TIMEOUT_SECONDS", 28_800),
            initial_providers: env_u64("INITIAL_PROVIDERS", 1) as u32,
            avg_visit_min: LaneDurations {
                high: env_u64("AVG_VISIT_HIGH_MIN", 20) as u32,
                medium: env_u64("AVG_VISIT_MEDIUM_MIN", 25) as u32,
                low: env_u64("AVG_VISIT_LOW_MIN", 15) as u32,
            },
            done_retention: Duration::from_secs(env_u64("DONE_RETENTION_SECONDS", 900)),
            camera_device: env::var("CAMERA_DEVICE").unwrap_or_else(|_| "/dev/video0".to_string()),
            camera_pipeline: env::var("CAMERA_PIPELINE").ok().filter(|s| !s.trim().is_empty()),
            camera_width: env_u64("CAMERA_WIDTH", 1280) as u32,
            camera_height: env_u64("CAMERA_HEIGHT", 720) as u32,
            capture_interval: Duration::from_millis(env_u64("CAPTURE_INTERVAL_MS", 250)),
            capture_timeout: Duration::from_millis(env_u64("CAPTURE_TIMEOUT_MS", 2_000)),
            scan_freshness: Duration::from_millis(env_u64("SCAN_FRESHNESS_MS", 2_000)),
            scan_reemit: Duration::from_millis(env_u64("SCAN_REEMIT_MS", 3_000)),
            stream_frame_interval: Duration::from_millis(env_u64("STREAM_FRAME_INTERVAL_MS", 100)),
            viewer_queue_capacity: env_u64("VIEWER_QUEUE_CAPACITY", 32) as usize,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| {
                    vec![
                        "http://localhost:3000".to_string(),
                        "http://127.0.0.1:3000".to_string(),
                    ]
                }),
        })
    }

    /// Get the full bind address (addr:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Build a config for tests without reading the environment
    pub fn config() -> ServerConfig {
        ServerConfig {
            port: 0,
            bind_addr: "127.0.0.1".to_string(),
            staff_password: "test-password".to_string(),
            session_timeout_seconds: 3600,
            initial_providers: 1,
            avg_visit_min: LaneDurations::default(),
            done_retention: Duration::from_secs(900),
            camera_device: "/dev/video0".to_string(),
            camera_pipeline: None,
            camera_width: 640,
            camera_height: 360,
            capture_interval: Duration::from_millis(10),
            capture_timeout: Duration::from_millis(100),
            scan_freshness: Duration::from_millis(2_000),
            scan_reemit: Duration::from_millis(3_000),
            stream_frame_interval: Duration::from_millis(10),
            viewer_queue_capacity: 4,
            cors_origins: Vec::new(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
