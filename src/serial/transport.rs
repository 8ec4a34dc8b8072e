//! Serial transport contract and the host implementation.

use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Line-delimited view of an open port. The stream ends when the device
/// goes away; an `Err` item reports a transport failure.
pub type LineStream = BoxStream<'static, io::Result<String>>;

/// An enumerated serial endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Path or port name (e.g. "/dev/ttyACM0", "COM3")
    pub id: String,
    /// USB vendor id as four lowercase hex digits
    pub vendor_id: Option<String>,
    /// USB product id as four lowercase hex digits
    pub product_id: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl DeviceDescriptor {
    /// Descriptor with no metadata, for explicitly configured paths.
    pub fn from_path(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vendor_id: None,
            product_id: None,
            manufacturer: None,
            product: None,
        }
    }
}

impl From<serialport::SerialPortInfo> for DeviceDescriptor {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let mut descriptor = DeviceDescriptor::from_path(info.port_name);
        if let serialport::SerialPortType::UsbPort(usb) = info.port_type {
            descriptor.vendor_id = Some(format!("{:04x}", usb.vid));
            descriptor.product_id = Some(format!("{:04x}", usb.pid));
            descriptor.manufacturer = usb.manufacturer;
            descriptor.product = usb.product;
        }
        descriptor
    }
}

/// What the port manager needs from the platform.
#[async_trait]
pub trait SerialTransport: Send + Sync {
    /// Enumerate available devices in platform order.
    fn list(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open `device` and start streaming its lines.
    async fn open(&self, device: &str, baud_rate: u32) -> Result<LineStream>;
}

/// Longest partial line kept while waiting for `\n`.
pub const MAX_PARTIAL_LINE: usize = 4096;

/// Transport backed by the `serialport` crate.
#[derive(Debug, Clone)]
pub struct SystemSerialTransport {
    read_timeout: Duration,
}

impl SystemSerialTransport {
    pub fn new() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
        }
    }

    /// How long each blocking read waits before re-checking the receiver.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl Default for SystemSerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SerialTransport for SystemSerialTransport {
    fn list(&self) -> Result<Vec<DeviceDescriptor>> {
        let ports = serialport::available_ports().map_err(io::Error::from)?;
        Ok(ports.into_iter().map(DeviceDescriptor::from).collect())
    }

    async fn open(&self, device: &str, baud_rate: u32) -> Result<LineStream> {
        let path = device.to_string();
        let read_timeout = self.read_timeout;
        let port = tokio::task::spawn_blocking(move || {
            serialport::new(&path, baud_rate)
                .timeout(read_timeout)
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None)
                .open()
        })
        .await
        .map_err(|e| MonitorError::open_error(device, e))?
        .map_err(|e| MonitorError::open_error(device, e))?;

        let (tx, rx) = mpsc::channel(256);
        let name = device.to_string();
        std::thread::Builder::new()
            .name(format!("serial-reader:{}", name))
            .spawn(move || read_lines(port, tx, &name))
            .map_err(|e| MonitorError::open_error(device, e))?;

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Blocking reader loop. Exits when the receiving side is dropped or the
/// port fails.
fn read_lines(
    mut port: Box<dyn serialport::SerialPort>,
    tx: mpsc::Sender<io::Result<String>>,
    name: &str,
) {
    let mut buf = [0u8; 256];
    let mut pending: Vec<u8> = Vec::new();

    while !tx.is_closed() {
        match port.read(&mut buf) {
            Ok(0) => {
                let _ = tx.blocking_send(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial port closed",
                )));
                break;
            }
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                for line in split_lines(&mut pending) {
                    if tx.blocking_send(Ok(line)).is_err() {
                        debug!("Reader for {} stopped: receiver dropped", name);
                        return;
                    }
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => {
                warn!("Serial read error on {}: {}", name, e);
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
    debug!("Reader for {} exited", name);
}

/// Drain complete `\n`-terminated lines from `pending`, leaving any partial tail.
///
/// A tail longer than [`MAX_PARTIAL_LINE`] is discarded: the peer is not
/// speaking the line protocol (wrong baud rate or another device).
pub fn split_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned());
    }
    if pending.len() > MAX_PARTIAL_LINE {
        warn!("Discarding {} bytes without a line break", pending.len());
        pending.clear();
    }
    lines
}
