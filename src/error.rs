//! Error handling for the gas sentinel crate.

use std::time::Duration;

/// A specialized `Result` type for gas sentinel operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// The main error type for sensor ingestion, port handling and collaborators.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Port enumeration returned no candidates
    #[error("No serial devices found. Plug in the sensor board")]
    NoDevicesFound,

    /// Every candidate failed to open
    #[error("None of the {attempted} serial devices responded like the sensor board")]
    NoResponsiveDevice { attempted: usize },

    /// Lower-level open failure (busy, permission denied, not present)
    #[error("Failed to open {device}: {reason}")]
    OpenError { device: String, reason: String },

    /// Open acknowledgement did not arrive in time
    #[error("Timed out after {timeout:?} opening {device}")]
    ConnectionTimeout { device: String, timeout: Duration },

    /// A baseline was requested before the device calibrated
    #[error("Sensor has not been calibrated on this connection")]
    NotCalibrated,

    /// Caution threshold above danger threshold
    #[error("Invalid thresholds: caution ({caution}) must not exceed danger ({danger})")]
    InvalidThresholds { caution: u32, danger: u32 },

    /// An external collaborator (store, messenger, archive, broadcast) failed
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    /// Create a new open error for `device`
    pub fn open_error(device: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::OpenError {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new collaborator error
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether the reconnection loop should retry after this error.
    pub fn is_port_error(&self) -> bool {
        matches!(
            self,
            Self::NoDevicesFound
                | Self::NoResponsiveDevice { .. }
                | Self::OpenError { .. }
                | Self::ConnectionTimeout { .. }
        )
    }
}
