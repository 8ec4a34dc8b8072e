//! Data structures for sensor lines, readings and broadcast events.

use crate::error::{MonitorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One delimiter-framed line as received from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    /// Line text with surrounding whitespace removed
    pub text: String,
    /// Wall-clock arrival time
    pub received_at: DateTime<Utc>,
}

impl RawLine {
    /// Create a line stamped with the current time.
    pub fn new(text: impl Into<String>) -> Self {
        Self::at(text, Utc::now())
    }

    /// Create a line with an explicit arrival time.
    pub fn at(text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            received_at,
        }
    }

    /// Whether nothing but whitespace was received.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Discrete risk classification of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Normal,
    Caution,
    Danger,
}

impl RiskTier {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Normal => "Normal",
            RiskTier::Caution => "Caution",
            RiskTier::Danger => "Danger",
        }
    }

    /// Caution and danger readings raise alerts.
    pub fn is_alert(&self) -> bool {
        !matches!(self, RiskTier::Normal)
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Difference thresholds above baseline. Always `caution <= danger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedThresholds")]
pub struct Thresholds {
    caution: u32,
    danger: u32,
}

/// Wire form of [`Thresholds`] before validation.
#[derive(Deserialize)]
struct UncheckedThresholds {
    caution: u32,
    danger: u32,
}

impl TryFrom<UncheckedThresholds> for Thresholds {
    type Error = MonitorError;

    fn try_from(raw: UncheckedThresholds) -> Result<Self> {
        Thresholds::new(raw.caution, raw.danger)
    }
}

impl Thresholds {
    /// Create thresholds, rejecting `caution > danger`.
    pub fn new(caution: u32, danger: u32) -> Result<Self> {
        if caution > danger {
            return Err(MonitorError::InvalidThresholds { caution, danger });
        }
        Ok(Self { caution, danger })
    }

    pub fn caution(&self) -> u32 {
        self.caution
    }

    pub fn danger(&self) -> u32 {
        self.danger
    }

    /// Replace either bound, validating the combined result.
    pub fn updated(&self, caution: Option<u32>, danger: Option<u32>) -> Result<Self> {
        Self::new(
            caution.unwrap_or(self.caution),
            danger.unwrap_or(self.danger),
        )
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            caution: crate::DEFAULT_CAUTION_THRESHOLD,
            danger: crate::DEFAULT_DANGER_THRESHOLD,
        }
    }
}

/// A classified measurement. The canonical output of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Value reported by the device
    pub current_value: u32,
    /// Baseline in effect when the reading was classified
    pub baseline: u32,
    /// `current_value - baseline`, fixed at classification time
    pub difference: i64,
    /// Risk tier under the thresholds current at classification time
    pub tier: RiskTier,
    /// Arrival time of the source line
    pub timestamp: DateTime<Utc>,
    /// Device path the line came from
    pub device: String,
    /// Original line text
    pub raw: String,
    /// Always true for emitted readings
    pub calibrated: bool,
}

/// Connection status change published on every port transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub device: Option<String>,
    pub message: String,
}

impl ConnectionStatus {
    pub fn connected(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            connected: true,
            device: Some(device.into()),
            message: message.into(),
        }
    }

    pub fn disconnected(device: Option<String>, message: impl Into<String>) -> Self {
        Self {
            connected: false,
            device,
            message: message.into(),
        }
    }
}

/// Alert payload for caution/danger readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub tier: RiskTier,
    pub message: String,
    pub current_value: u32,
    pub baseline: u32,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Build the alert for a reading, or `None` for normal readings.
    pub fn for_reading(reading: &Reading) -> Option<Self> {
        if !reading.tier.is_alert() {
            return None;
        }
        Some(Self {
            tier: reading.tier,
            message: format!(
                "{}: difference of {} points",
                reading.tier.label().to_uppercase(),
                reading.difference
            ),
            current_value: reading.current_value,
            baseline: reading.baseline,
            timestamp: reading.timestamp,
        })
    }
}

/// Everything published to real-time subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SensorEvent {
    SensorData(Reading),
    ConnectionStatus(ConnectionStatus),
    Alert(Alert),
}

impl SensorEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            SensorEvent::SensorData(_) => "sensor_data",
            SensorEvent::ConnectionStatus(_) => "connection_status",
            SensorEvent::Alert(_) => "alert",
        }
    }
}

/// Latest known state, served to late subscribers and the status API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub connected: bool,
    pub device: Option<String>,
    pub status_message: String,
    pub latest: Option<Reading>,
    pub last_alert: Option<Alert>,
}

impl SensorSnapshot {
    /// Fold a published event into the snapshot.
    pub fn apply(&mut self, event: &SensorEvent) {
        match event {
            SensorEvent::SensorData(reading) => {
                self.connected = true;
                self.latest = Some(reading.clone());
            }
            SensorEvent::ConnectionStatus(status) => {
                self.connected = status.connected;
                if status.device.is_some() || !status.connected {
                    self.device = status.device.clone();
                }
                self.status_message = status.message.clone();
            }
            SensorEvent::Alert(alert) => {
                self.last_alert = Some(alert.clone());
            }
        }
    }

    /// Status payload sent to a freshly connected client.
    pub fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: self.connected,
            device: self.device.clone(),
            message: if self.status_message.is_empty() {
                if self.connected {
                    "Sensor connected".to_string()
                } else {
                    "Sensor disconnected".to_string()
                }
            } else {
                self.status_message.clone()
            },
        }
    }
}
