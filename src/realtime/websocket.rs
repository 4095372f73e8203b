//! WebSocket endpoint for queue subscribers.
//!
//! Every connection gets the full current snapshot immediately, then one
//! message per scheduler recomputation. The hub drops us if we fall
//! behind; the send loop then ends and the socket closes, and the viewer
//! reconnects with backoff.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::state::ServerState;

/// Interval between server pings so half-open connections get reaped
const PING_INTERVAL: Duration = Duration::from_secs(20);

/// Handle WebSocket upgrade for /ws/queue
pub async fn queue_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (viewer_id, mut updates) = state.hub.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Full current snapshot on connect; no replay buffer needed after this
    let snapshot = state.queue_payload();
    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                state.hub.unsubscribe(&viewer_id);
                return;
            }
        }
        Err(err) => {
            debug!("Failed to serialize initial snapshot: {err}");
            state.hub.unsubscribe(&viewer_id);
            return;
        }
    }

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // Hub dropped us (slow viewer) or shut down
                    None => break,
                }
            }
            _ = ping.tick() => {
                let ping_msg = json!({"type": "ping", "ts": Utc::now()}).to_string();
                if sender.send(Message::Text(ping_msg.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Viewers are read-only; ignore anything they send
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unsubscribe(&viewer_id);
}
