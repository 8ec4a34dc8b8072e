//! Append-only JSON lines store for readings and audit records.

use super::ReadingStore;
use crate::error::Result;
use crate::sensor::Reading;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One line of the store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredRecord {
    Reading(Reading),
    Audit {
        raw: String,
        timestamp: DateTime<Utc>,
    },
}

/// Appends one JSON object per record to a file.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    // Serialises appends from concurrent dispatches
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &StoredRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for JsonLinesStore {
    async fn save(&self, reading: &Reading) -> Result<()> {
        self.append(&StoredRecord::Reading(reading.clone())).await
    }

    async fn save_audit_line(&self, raw: &str, timestamp: DateTime<Utc>) -> Result<()> {
        self.append(&StoredRecord::Audit {
            raw: raw.to_string(),
            timestamp,
        })
        .await
    }
}
