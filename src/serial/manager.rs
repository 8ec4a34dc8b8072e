//! Device discovery and the lifecycle of the single active connection.

use crate::collaborators::Broadcaster;
use crate::error::{MonitorError, Result};
use crate::sensor::{ConnectionStatus, RawLine, SensorEvent};
use crate::serial::transport::{DeviceDescriptor, LineStream, SerialTransport};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Metadata that identifies boards likely to be the sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSignatures {
    /// USB vendor ids, four lowercase hex digits
    pub vendor_ids: Vec<String>,
    /// Case-insensitive substrings of the manufacturer or product string
    pub name_fragments: Vec<String>,
}

impl Default for DeviceSignatures {
    fn default() -> Self {
        Self {
            // Arduino LLC, QinHeng CH340
            vendor_ids: vec!["2341".to_string(), "1a86".to_string()],
            name_fragments: vec![
                "arduino".to_string(),
                "ch340".to_string(),
                "ftdi".to_string(),
            ],
        }
    }
}

impl DeviceSignatures {
    pub fn matches(&self, descriptor: &DeviceDescriptor) -> bool {
        let vendor_match = descriptor
            .vendor_id
            .as_deref()
            .map(|vid| self.vendor_ids.iter().any(|known| known.eq_ignore_ascii_case(vid)))
            .unwrap_or(false);

        let name_match = [&descriptor.manufacturer, &descriptor.product]
            .into_iter()
            .flatten()
            .map(|name| name.to_lowercase())
            .any(|name| {
                self.name_fragments
                    .iter()
                    .any(|fragment| name.contains(&fragment.to_lowercase()))
            });

        vendor_match || name_match
    }
}

/// Serial connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub connect_timeout: Duration,
    /// Back-off between reconnection attempts
    pub retry_interval: Duration,
    /// Connect only to this device instead of discovering
    pub device: Option<String>,
    pub signatures: DeviceSignatures,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: crate::DEFAULT_BAUD_RATE,
            connect_timeout: Duration::from_secs(crate::DEFAULT_CONNECT_TIMEOUT_SECS),
            retry_interval: Duration::from_secs(crate::DEFAULT_RETRY_INTERVAL_SECS),
            device: None,
            signatures: DeviceSignatures::default(),
        }
    }
}

impl SerialConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_device(mut self, device: Option<String>) -> Self {
        self.device = device;
        self
    }
}

/// The active serial link. Owned exclusively by [`PortManager`].
pub struct Connection {
    device: String,
    baud_rate: u32,
    opened_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    lines: LineStream,
}

impl Connection {
    fn new(device: String, baud_rate: u32, lines: LineStream) -> Self {
        let now = Utc::now();
        Self {
            device,
            baud_rate,
            opened_at: now,
            last_activity: now,
            lines,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Arrival time of the last line, or the open time before any line.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("device", &self.device)
            .field("baud_rate", &self.baud_rate)
            .field("opened_at", &self.opened_at)
            .field("last_activity", &self.last_activity)
            .finish_non_exhaustive()
    }
}

/// Finds the sensor among the host's serial devices and keeps exactly one
/// connection open.
pub struct PortManager {
    transport: Arc<dyn SerialTransport>,
    broadcaster: Arc<dyn Broadcaster>,
    config: SerialConfig,
    active: Option<Connection>,
}

impl PortManager {
    pub fn new(
        transport: Arc<dyn SerialTransport>,
        broadcaster: Arc<dyn Broadcaster>,
        config: SerialConfig,
    ) -> Self {
        Self {
            transport,
            broadcaster,
            config,
            active: None,
        }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.active.as_ref()
    }

    /// Enumerate devices. Enumeration failures count as "nothing found".
    pub fn discover_candidates(&self) -> Vec<DeviceDescriptor> {
        match self.transport.list() {
            Ok(candidates) => {
                info!("Found {} serial devices", candidates.len());
                candidates
            }
            Err(e) => {
                warn!("Failed to enumerate serial devices: {}", e);
                Vec::new()
            }
        }
    }

    /// Whether a descriptor matches a known board signature.
    pub fn is_known_device(&self, descriptor: &DeviceDescriptor) -> bool {
        self.config.signatures.matches(descriptor)
    }

    /// Signature matches first; enumeration order otherwise preserved.
    pub fn rank_candidates(&self, candidates: Vec<DeviceDescriptor>) -> Vec<DeviceDescriptor> {
        let (mut known, other): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|candidate| self.is_known_device(candidate));
        known.extend(other);
        known
    }

    /// Open `descriptor`, replacing any current connection.
    pub async fn connect(
        &mut self,
        descriptor: &DeviceDescriptor,
        timeout: Duration,
    ) -> Result<&Connection> {
        if self.active.is_some() {
            self.drop_active("Switching serial device");
        }

        let device = descriptor.id.clone();
        let baud_rate = self.config.baud_rate;
        let lines = match tokio::time::timeout(timeout, self.transport.open(&device, baud_rate)).await
        {
            Ok(Ok(lines)) => lines,
            Ok(Err(e @ MonitorError::OpenError { .. }))
            | Ok(Err(e @ MonitorError::ConnectionTimeout { .. })) => return Err(e),
            Ok(Err(e)) => return Err(MonitorError::open_error(&device, e)),
            Err(_) => return Err(MonitorError::ConnectionTimeout { device, timeout }),
        };

        info!("Connected to {} at {} baud", device, baud_rate);
        self.publish_status(ConnectionStatus::connected(
            device.clone(),
            "Sensor connected",
        ));
        Ok(self
            .active
            .insert(Connection::new(device, baud_rate, lines)))
    }

    /// Try ranked candidates in order until one opens.
    pub async fn auto_connect(&mut self) -> Result<String> {
        let candidates = match &self.config.device {
            Some(device) => vec![DeviceDescriptor::from_path(device.clone())],
            None => {
                let found = self.discover_candidates();
                self.rank_candidates(found)
            }
        };

        if candidates.is_empty() {
            let err = MonitorError::NoDevicesFound;
            self.publish_status(ConnectionStatus::disconnected(None, err.to_string()));
            return Err(err);
        }

        let timeout = self.config.connect_timeout;
        for candidate in &candidates {
            info!("Trying {}...", candidate.id);
            match self.connect(candidate, timeout).await {
                Ok(connection) => return Ok(connection.device().to_string()),
                Err(e) => warn!("{} did not respond: {}", candidate.id, e),
            }
        }

        let err = MonitorError::NoResponsiveDevice {
            attempted: candidates.len(),
        };
        self.publish_status(ConnectionStatus::disconnected(None, err.to_string()));
        Err(err)
    }

    /// Next line from the active connection.
    ///
    /// Returns `None` when there is no connection or it has just been lost;
    /// in the latter case the connection is dropped and a disconnected status
    /// is published.
    pub async fn next_line(&mut self) -> Option<RawLine> {
        let connection = self.active.as_mut()?;
        match connection.lines.next().await {
            Some(Ok(text)) => {
                let line = RawLine::new(text);
                connection.last_activity = line.received_at;
                Some(line)
            }
            Some(Err(e)) => {
                warn!("Serial error on {}: {}", connection.device, e);
                self.drop_active(format!("Error: {}", e));
                None
            }
            None => {
                info!("Serial port {} closed", connection.device);
                self.drop_active("Sensor disconnected");
                None
            }
        }
    }

    /// Close the active connection. Closing with nothing open is a no-op.
    pub fn close(&mut self) {
        if self.active.is_some() {
            info!("Closing serial port...");
            self.drop_active("Connection closed by user");
        }
    }

    fn drop_active(&mut self, reason: impl Into<String>) {
        if let Some(connection) = self.active.take() {
            let reason: String = reason.into();
            let device = connection.device.clone();
            info!(
                "Dropping {} after {}s (last activity {}): {}",
                device,
                (Utc::now() - connection.opened_at).num_seconds(),
                connection.last_activity.to_rfc3339(),
                reason
            );
            // Dropping the stream stops the reader and releases the handle
            drop(connection);
            self.publish_status(ConnectionStatus::disconnected(Some(device), reason));
        }
    }

    fn publish_status(&self, status: ConnectionStatus) {
        if let Err(e) = self
            .broadcaster
            .publish(SensorEvent::ConnectionStatus(status))
        {
            warn!("Failed to publish connection status: {}", e);
        }
    }
}

impl Drop for PortManager {
    fn drop(&mut self) {
        self.close();
    }
}
