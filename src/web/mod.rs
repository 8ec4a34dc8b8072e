//! Web server and API endpoints.
//!
//! REST endpoints for status and runtime configuration, plus a WebSocket
//! stream of sensor events fed by the [`hub::EventHub`].

pub mod config;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use hub::EventHub;
pub use router::create_app;

use crate::error::{MonitorError, Result};
use crate::state::SharedState;
use tracing::info;

/// State handed to every handler.
#[derive(Debug, Clone)]
pub struct WebContext {
    pub state: SharedState,
    pub config: WebConfig,
}

impl WebContext {
    pub fn new(state: SharedState, config: WebConfig) -> Self {
        Self { state, config }
    }
}

/// Start the web server with the provided configuration and shared state.
pub async fn start_web_server(config: WebConfig, state: SharedState) -> Result<()> {
    let addr = config.socket_addr()?;

    let app = create_app(WebContext::new(state, config));

    info!("Starting gas sentinel web server on http://{}", addr);
    info!("API endpoint: http://{}/api/sensor/current", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MonitorError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| MonitorError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
