//! Web server configuration.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// HTTP and WebSocket listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Directory holding the dashboard's `index.html`
    pub static_path: Option<String>,
    /// Concurrent WebSocket subscribers; further upgrades get 503
    pub max_websocket_connections: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
            static_path: None,
            max_websocket_connections: 100,
        }
    }
}

impl WebConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    pub fn with_static_path(mut self, path: Option<String>) -> Self {
        self.static_path = path;
        self
    }

    pub fn with_max_websocket_connections(mut self, max: usize) -> Self {
        self.max_websocket_connections = max;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed listener address. A server that can accept no subscribers
    /// is rejected as well.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        if self.max_websocket_connections == 0 {
            return Err(MonitorError::config_error(
                "max_websocket_connections must be at least 1",
            ));
        }
        self.bind_address()
            .parse()
            .map_err(|e| MonitorError::config_error(format!("Invalid bind address: {}", e)))
    }
}
