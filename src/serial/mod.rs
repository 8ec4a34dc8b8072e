//! Serial device discovery and connection management.

pub mod manager;
pub mod transport;

// Re-export commonly used items
pub use manager::{Connection, DeviceSignatures, PortManager, SerialConfig};
pub use transport::{DeviceDescriptor, LineStream, SerialTransport, SystemSerialTransport};
