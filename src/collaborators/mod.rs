//! Contracts for the external systems the pipeline talks to.
//!
//! Every call returns a [`Result`]; the pipeline inspects and logs failures
//! and never lets them stop ingestion.

pub mod archive;
pub mod messenger;
pub mod store;

pub use archive::DirectoryArchive;
pub use messenger::LogMessenger;
pub use store::JsonLinesStore;

use crate::error::Result;
use crate::sensor::{RawLine, Reading, SensorEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable storage of readings and audit lines.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist a classified reading.
    async fn save(&self, reading: &Reading) -> Result<()>;

    /// Persist a raw line that produced no reading.
    async fn save_audit_line(&self, raw: &str, timestamp: DateTime<Utc>) -> Result<()>;
}

/// Outbound chat notifications.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Periodic archival of the rolling line buffer.
#[async_trait]
pub trait ArchiveUploader: Send + Sync {
    /// Upload a batch, returning where it landed.
    async fn upload(&self, batch: &[RawLine]) -> Result<String>;
}

/// Real-time push to UI subscribers.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: SensorEvent) -> Result<()>;
}
