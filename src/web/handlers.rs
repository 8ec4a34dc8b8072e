//! HTTP handlers for API endpoints.

use crate::error::MonitorError;
use crate::state::SettingsUpdate;
use crate::web::WebContext;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
};
use serde_json::{json, Value};
use tracing::{error, warn};

/// Service banner.
pub async fn root(State(ctx): State<WebContext>) -> Json<Value> {
    let snapshot = ctx.state.hub().snapshot();
    Json(json!({
        "message": "Gas sentinel API",
        "status": "online",
        "sensor": if snapshot.connected { "connected" } else { "disconnected" },
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Health check endpoint.
pub async fn health_check(State(ctx): State<WebContext>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "gas-sentinel",
        "version": env!("CARGO_PKG_VERSION"),
        "websocket_clients": ctx.state.hub().subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Latest sensor snapshot.
pub async fn current_sensor(
    State(ctx): State<WebContext>,
) -> Result<Json<Value>, StatusCode> {
    serde_json::to_value(ctx.state.hub().snapshot())
        .map(Json)
        .map_err(|e| {
            error!("Failed to serialize snapshot: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Connection status and the last line seen.
pub async fn sensor_status(State(ctx): State<WebContext>) -> Json<Value> {
    let snapshot = ctx.state.hub().snapshot();
    Json(json!({
        "connected": snapshot.connected,
        "device": snapshot.device,
        "message": snapshot.status_message,
        "last_line": snapshot.latest.as_ref().map(|r| r.raw.clone()),
        "baseline": snapshot.latest.as_ref().map(|r| r.baseline),
    }))
}

/// Current thresholds and upload interval.
pub async fn get_config(State(ctx): State<WebContext>) -> Json<Value> {
    Json(json!(ctx.state.settings().await.view()))
}

/// Partial update of thresholds and upload interval.
pub async fn update_config(
    State(ctx): State<WebContext>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match ctx.state.update_settings(&update).await {
        Ok(settings) => Ok(Json(json!({
            "message": "Configuration updated",
            "settings": settings.view(),
        }))),
        Err(e @ MonitorError::InvalidThresholds { .. }) => {
            warn!("Rejected configuration update: {}", e);
            Err((StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))))
        }
        Err(e) => {
            error!("Configuration update failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// Serve the dashboard page from the static directory.
pub async fn serve_index(State(ctx): State<WebContext>) -> Result<Html<String>, StatusCode> {
    let Some(dir) = ctx.config.static_path.as_ref() else {
        return Err(StatusCode::NOT_FOUND);
    };
    let index = std::path::Path::new(dir).join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(content) => Ok(Html(content)),
        Err(e) => {
            error!("Failed to read {:?}: {}", index, e);
            Err(StatusCode::NOT_FOUND)
        }
    }
}
