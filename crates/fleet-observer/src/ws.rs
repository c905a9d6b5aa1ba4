//! `WebSocket` live feed.
//!
//! Clients connect to `GET /ws`. Each connection becomes one subscriber in
//! the [`Broadcaster`](fleet_core::broadcast::Broadcaster) and receives every
//! event as a JSON text frame:
//!
//! ```json
//! {"type": "bus_update", "data": [...]}
//! {"type": "notification", "message": "...", "severity": "warning"}
//! ```
//!
//! The subscriber is unregistered as soon as the connection ends, whether
//! by a close frame, a socket error, or a failed send. If the broadcaster
//! drops a lagging subscriber, the connection is closed.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use fleet_core::broadcast::Subscription;
use fleet_types::LiveEvent;
use tracing::{debug, warn};

use crate::error::ObserverError;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming live events.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_live(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe, forward, unregister.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.subscribe().await;
    let id = subscription.id();
    debug!(subscriber = %id, "WebSocket client connected");

    forward_events(&mut socket, &mut subscription).await;

    state.broadcaster.unregister(id).await;
    debug!(subscriber = %id, "WebSocket client finished");
}

/// Encode a live event as a text frame.
pub fn encode_event(event: &LiveEvent) -> Result<Message, ObserverError> {
    let json = serde_json::to_string(event)?;
    Ok(Message::Text(json.into()))
}

async fn forward_events(socket: &mut WebSocket, subscription: &mut Subscription) {
    loop {
        tokio::select! {
            // Next event from the broadcaster.
            event = subscription.recv() => {
                let Some(event) = event else {
                    debug!("Subscriber dropped by broadcaster, closing WebSocket");
                    let _ = socket.send(Message::Close(None)).await;
                    return;
                };
                let msg = match encode_event(&event) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(kind = event.kind(), "Failed to serialize live event: {e}");
                        continue;
                    }
                };
                if socket.send(msg).await.is_err() {
                    debug!("WebSocket client disconnected (send failed)");
                    return;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Ignore other message types (text, binary from client).
                    }
                }
            }
        }
    }
}
