//! WebSocket handler for real-time sensor events.

use crate::sensor::SensorEvent;
use crate::web::WebContext;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Client request for an immediate snapshot.
const REQUEST_SENSOR_DATA: &str = "request_sensor_data";

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(ctx): State<WebContext>) -> Response {
    let clients = ctx.state.hub().subscriber_count();
    if clients >= ctx.config.max_websocket_connections {
        warn!("Refusing WebSocket client: {} already connected", clients);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| handle_websocket(socket, ctx))
}

/// Events a newly connected (or asking) client is brought up to date with.
pub fn catch_up_events(ctx: &WebContext) -> Vec<SensorEvent> {
    let snapshot = ctx.state.hub().snapshot();
    let mut events = Vec::with_capacity(2);
    if let Some(reading) = snapshot.latest.clone() {
        events.push(SensorEvent::SensorData(reading));
    }
    events.push(SensorEvent::ConnectionStatus(snapshot.connection_status()));
    events
}

async fn send_event(socket: &mut WebSocket, event: &SensorEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize {} event: {}", event.name(), e);
            true
        }
    }
}

/// Handle a WebSocket connection.
async fn handle_websocket(mut socket: WebSocket, ctx: WebContext) {
    let client_id = uuid::Uuid::new_v4().to_string();
    info!("WebSocket client connected: {}", client_id);

    let mut rx = ctx.state.hub().subscribe();

    for event in catch_up_events(&ctx) {
        if !send_event(&mut socket, &event).await {
            return;
        }
    }

    'session: loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    debug!("Received message from {}: {}", client_id, text);
                    if text.trim() == REQUEST_SENSOR_DATA {
                        for event in catch_up_events(&ctx) {
                            if !send_event(&mut socket, &event).await {
                                break 'session;
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error for client {}: {}", client_id, e);
                    break;
                }
            },
            event = rx.recv() => match event {
                Ok(event) => {
                    if !send_event(&mut socket, &event).await {
                        warn!("Failed to send to client {}", client_id);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {} lagged, skipped {} events", client_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("WebSocket client disconnected: {}", client_id);
}
