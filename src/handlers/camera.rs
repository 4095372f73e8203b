use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::Response,
    Json,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;

/// MJPEG stream of the latest published frame.
///
/// Frames are repeated from the cache at a bounded rate, fully decoupled
/// from the capture loop: a slow viewer only slows its own connection.
pub async fn camera_stream(State(state): State<Arc<ServerState>>) -> ApiResult<Response> {
    // Nothing published yet means the worker has not started
    if state.frame_cache.latest_frame().is_none() {
        return Err(ApiError::DeviceUnavailable);
    }

    let cache = state.frame_cache.clone();
    let frame_interval = state.config.stream_frame_interval;

    let stream = async_stream::stream! {
        loop {
            if let Some(frame) = cache.latest_frame() {
                let mut chunk =
                    Vec::with_capacity(frame.len() + 64);
                chunk.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
                chunk.extend_from_slice(&frame);
                chunk.extend_from_slice(b"\r\n");
                yield Ok::<_, Infallible>(Bytes::from(chunk));
            }
            tokio::time::sleep(frame_interval).await;
        }
    };

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Last decoded scan
#[derive(Debug, Serialize)]
pub struct LastScanResponse {
    pub value: String,
    pub fresh: bool,
}

/// Latest decoded code with its freshness verdict.
///
/// A stale decode reports `fresh: false` and an empty value: past the
/// freshness window the code is absence, not data, and the kiosk falls
/// back to manual entry.
pub async fn last_scan(State(state): State<Arc<ServerState>>) -> Json<LastScanResponse> {
    let response = match state.frame_cache.last_scan() {
        Some(scan) if scan.fresh => LastScanResponse {
            value: scan.value,
            fresh: true,
        },
        _ => LastScanResponse {
            value: String::new(),
            fresh: false,
        },
    };
    Json(response)
}
