//! # Gas Sentinel - Serial Gas Sensor Monitor
//!
//! Ingests the newline-delimited status lines a gas-sensor board prints over
//! a serial link, tracks the board's calibration baseline, classifies every
//! measurement into a risk tier and fans the result out to WebSocket
//! subscribers, a notification channel, a readings store and a periodic
//! archive.
//!
//! ## Features
//!
//! - **Port discovery**: ranked probing of serial devices by vendor signature
//! - **Calibration tracking**: per-connection baseline, reset on reconnect
//! - **Risk tiers**: normal / caution / danger against live thresholds
//! - **Real-time push**: WebSocket events plus a REST status/config API
//! - **Resilient side effects**: collaborator failures are logged, never fatal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gas_sentinel::{
//!     AppState, Collaborators, DirectoryArchive, IngestPipeline, JsonLinesStore, LogMessenger,
//!     Monitor, PipelineConfig, PortManager, SerialConfig, SystemSerialTransport,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::shared(Default::default());
//!     let collaborators = Collaborators {
//!         store: Arc::new(JsonLinesStore::new("data/readings.jsonl")),
//!         messenger: Arc::new(LogMessenger::new()),
//!         archive: Arc::new(DirectoryArchive::new("data/archive")),
//!         broadcaster: state.clone(),
//!     };
//!     let ports = PortManager::new(
//!         Arc::new(SystemSerialTransport::new()),
//!         state.clone(),
//!         SerialConfig::default(),
//!     );
//!     let pipeline = IngestPipeline::new(state, collaborators, PipelineConfig::default());
//!
//!     Monitor::new(ports, pipeline)
//!         .run(async { let _ = tokio::signal::ctrl_c().await; })
//!         .await;
//! }
//! ```

pub mod collaborators;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod sensor;
pub mod serial;
pub mod state;
pub mod web;

// Re-export public API
pub use collaborators::{
    ArchiveUploader, Broadcaster, DirectoryArchive, JsonLinesStore, LogMessenger, Messenger,
    ReadingStore,
};
pub use error::{MonitorError, Result};
pub use monitor::Monitor;
pub use pipeline::{Collaborators, IngestPipeline, LineOutcome, PipelineConfig, UploadScheduler};
pub use sensor::{
    classify, parse_line, Alert, CalibrationState, ConnectionStatus, ParsedEvent, RawLine,
    Reading, RiskTier, SensorEvent, SensorSnapshot, Thresholds,
};
pub use serial::{
    DeviceDescriptor, PortManager, SerialConfig, SerialTransport, SystemSerialTransport,
};
pub use state::{AppState, RuntimeSettings, SettingsUpdate, SharedState};
pub use web::{start_web_server, WebConfig};

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default time allowed for a port to open, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default back-off between reconnection attempts, in seconds
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 10;

/// Default archival upload interval, in seconds
pub const DEFAULT_UPLOAD_INTERVAL_SECS: u64 = 30;

/// Default difference above baseline that raises a caution alert
pub const DEFAULT_CAUTION_THRESHOLD: u32 = 15;

/// Default difference above baseline that raises a danger alert
pub const DEFAULT_DANGER_THRESHOLD: u32 = 60;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 3001;
