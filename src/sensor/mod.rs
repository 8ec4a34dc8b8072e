//! Sensor protocol and classification.
//!
//! Pure, I/O-free building blocks of the ingestion path: line parsing,
//! calibration tracking, risk classification and the data types passed to
//! collaborators.

pub mod calibration;
pub mod classifier;
pub mod data;
pub mod parser;

// Re-export commonly used items
pub use calibration::CalibrationState;
pub use classifier::classify;
pub use data::{
    Alert, ConnectionStatus, RawLine, Reading, RiskTier, SensorEvent, SensorSnapshot, Thresholds,
};
pub use parser::{parse_line, ParsedEvent};
