//! Archival of raw line batches as timestamped text logs.

use super::ArchiveUploader;
use crate::error::Result;
use crate::sensor::RawLine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

const RULE: &str = "=======================================";

/// Writes each batch to its own file inside a directory.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    dir: PathBuf,
}

impl DirectoryArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(at: DateTime<Utc>) -> String {
        format!("sensor_log_{}.txt", at.format("%Y%m%d_%H%M%S_%3f"))
    }
}

/// Render a batch as a human-readable log.
pub fn render_batch(batch: &[RawLine], generated_at: DateTime<Utc>) -> String {
    let started = batch.first().map(|l| l.received_at).unwrap_or(generated_at);
    let mut out = String::new();

    out.push_str(RULE);
    out.push_str("\n    GAS SENSOR LOG\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Date: {}\n", started.format("%Y-%m-%d")));
    out.push_str(&format!("Start time: {}\n", started.format("%H:%M:%S")));
    out.push_str(RULE);
    out.push_str("\n\n");

    for line in batch {
        out.push_str(&format!(
            "{} | {}\n",
            line.received_at.format("%H:%M:%S"),
            line.text
        ));
    }

    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("End time: {}\n", generated_at.format("%H:%M:%S")));
    out.push_str(&format!("Total records: {}\n", batch.len()));
    out.push_str(RULE);
    out.push('\n');
    out
}

#[async_trait]
impl ArchiveUploader for DirectoryArchive {
    async fn upload(&self, batch: &[RawLine]) -> Result<String> {
        let now = Utc::now();
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(Self::file_name(now));
        tokio::fs::write(&path, render_batch(batch, now)).await?;
        Ok(path.display().to_string())
    }
}
