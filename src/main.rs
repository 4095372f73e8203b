use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use carelane_server::{
    auth::staff_auth_middleware,
    camera::{placeholder_jpeg, CameraWorker, FfmpegSource, FrameSource},
    cli::{Cli, Commands},
    config::ServerConfig,
    handlers::{
        audit_tail, camera_stream, check_in, get_providers, health_check, last_scan,
        latest_vitals, lobby_load_view, public_queue, qr_image, set_providers, set_status,
        staff_login, staff_logout, staff_queue, submit_intake, submit_vitals, triage_query,
    },
    realtime::queue_websocket,
    state::ServerState,
};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Body limit for JSON API requests
const MAX_API_BODY_SIZE: usize = 256 * 1024;

/// Placeholder frame dimensions served while the camera is down
const PLACEHOLDER_SIZE: (u32, u32) = (640, 360);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carelane_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = ServerConfig::from_env()?;

    match cli.command {
        Some(Commands::ProbeCamera) => {
            let mut source = FfmpegSource::from_config(&config);
            println!("Probing {}", source.describe());
            match source.grab().await {
                Ok(frame) => println!("OK: captured {} byte frame", frame.len()),
                Err(err) => println!("FAILED: {err}"),
            }
            return Ok(());
        }
        Some(Commands::Serve) | None => {
            // Continue to run server
        }
    }

    info!("Starting Carelane Server v{VERSION}");
    info!("   Port: {}", config.port);
    info!("   Bind address: {}", config.bind_addr);
    info!("   Providers on shift: {}", config.initial_providers);
    info!(
        "   Camera: {}",
        config
            .camera_pipeline
            .clone()
            .unwrap_or_else(|| config.camera_device.clone())
    );
    info!("   Scan freshness window: {:?}", config.scan_freshness);

    // Create server state
    let state = Arc::new(ServerState::new(config.clone()));

    // Spawn the dedicated camera capture worker. It owns the device;
    // handlers only ever read the cache it publishes into.
    {
        let source = FfmpegSource::from_config(&config);
        let worker = CameraWorker::new(
            Box::new(source),
            state.frame_cache.clone(),
            placeholder_jpeg(PLACEHOLDER_SIZE.0, PLACEHOLDER_SIZE.1),
            config.capture_interval,
        );
        tokio::spawn(worker.run());
    }

    // Spawn background task to evict completed encounters
    {
        let state = state.clone();
        let retention = config.done_retention;
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = state.store.evict_done(retention);
                if evicted > 0 {
                    info!("Evicted {evicted} completed encounters");
                }
            }
        });
    }

    // Spawn background task to cleanup expired staff sessions
    {
        let session_manager = state.auth.session_manager.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                let cleaned = session_manager.cleanup_expired();
                if cleaned > 0 {
                    info!("Cleaned up {cleaned} expired staff sessions");
                }
            }
        });
    }

    // Spawn background task to cleanup rate limiter entries
    {
        let rate_limiter = state.auth.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(120));
            loop {
                interval.tick().await;
                let cleaned = rate_limiter.cleanup();
                if cleaned > 0 {
                    info!("Cleaned up {cleaned} rate limiter entries");
                }
            }
        });
    }

    // Build router
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/intake", post(submit_intake))
        .route("/api/qr/{pid}", get(qr_image))
        .route("/api/checkin", post(check_in))
        .route("/api/vitals", post(submit_vitals))
        .route("/api/vitals/{patient_ref}", get(latest_vitals))
        .route("/api/triage/{patient_ref}", get(triage_query))
        .route("/api/queue", get(public_queue))
        .route("/api/lobby-load", get(lobby_load_view))
        .route("/api/camera/last-scan", get(last_scan))
        .route("/camera/stream", get(camera_stream))
        .route("/api/staff/login", post(staff_login));

    let staff_routes = Router::new()
        .route("/api/staff/queue", get(staff_queue))
        .route("/api/staff/status", post(set_status))
        .route("/api/staff/providers", get(get_providers).put(set_providers))
        .route("/api/staff/audit", get(audit_tail))
        .route("/api/staff/logout", post(staff_logout))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            staff_auth_middleware,
        ));

    let ws_routes = Router::new().route("/ws/queue", get(queue_websocket));

    // CORS configuration - configurable via CORS_ORIGINS env var
    let cors_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(cors_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true);

    let app = Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .merge(ws_routes)
        .layer(RequestBodyLimitLayer::new(MAX_API_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state.clone());

    // Start server
    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Listening on http://{addr}");
    info!("WebSocket endpoint: ws://{addr}/ws/queue");
    info!("Camera stream: http://{addr}/camera/stream");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        warn!("Server exited with error: {err}");
        return Err(err.into());
    }

    Ok(())
}
