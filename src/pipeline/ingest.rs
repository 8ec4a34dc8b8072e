//! End-to-end processing of one line from the device.

use crate::collaborators::{ArchiveUploader, Broadcaster, Messenger, ReadingStore};
use crate::error::Result;
use crate::pipeline::scheduler::UploadScheduler;
use crate::sensor::{
    classifier, parse_line, Alert, CalibrationState, ParsedEvent, RawLine, Reading, RiskTier,
    SensorEvent,
};
use crate::state::SharedState;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Pipeline behaviour switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Send unrecognised lines to the store as audit records
    pub audit_unrecognized: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            audit_unrecognized: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_audit_unrecognized(mut self, audit: bool) -> Self {
        self.audit_unrecognized = audit;
        self
    }
}

/// The external systems a pipeline dispatches to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ReadingStore>,
    pub messenger: Arc<dyn Messenger>,
    pub archive: Arc<dyn ArchiveUploader>,
    pub broadcaster: Arc<dyn Broadcaster>,
}

/// What happened to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Nothing but whitespace
    Blank,
    Calibrated { baseline: u32 },
    Classified(Reading),
    /// Measurement seen before any calibration on this connection
    DiscardedUncalibrated { current_value: u32 },
    Unrecognized,
}

/// Chat text for a caution/danger reading.
pub fn alert_message(reading: &Reading) -> Option<String> {
    match reading.tier {
        RiskTier::Danger => Some(format!(
            "🚨 DANGER! Sensor value rose {} points above baseline ({}). Current value: {}",
            reading.difference, reading.baseline, reading.current_value
        )),
        RiskTier::Caution => Some(format!(
            "⚠️ Caution: sensor value rose {} points above baseline ({}). Current value: {}",
            reading.difference, reading.baseline, reading.current_value
        )),
        RiskTier::Normal => None,
    }
}

pub fn calibration_message(baseline: u32) -> String {
    format!("✅ Sensor calibrated. Baseline: {}", baseline)
}

pub fn startup_message(device: &str) -> String {
    format!("🚀 Gas detector started on {}", device)
}

/// Parses, classifies and fans out lines from the active connection,
/// processing them strictly one at a time.
///
/// Collaborator calls are spawned and never awaited on the line path; their
/// failures are logged and dropped.
pub struct IngestPipeline {
    state: SharedState,
    collaborators: Collaborators,
    config: PipelineConfig,
    device: String,
    calibration: CalibrationState,
    scheduler: UploadScheduler,
    in_flight: JoinSet<()>,
}

impl IngestPipeline {
    pub fn new(state: SharedState, collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            state,
            collaborators,
            config,
            device: String::new(),
            calibration: CalibrationState::new(),
            scheduler: UploadScheduler::new(),
            in_flight: JoinSet::new(),
        }
    }

    /// Start a new connection: calibration does not survive a reconnect.
    pub fn begin_connection(&mut self, device: impl Into<String>) {
        self.device = device.into();
        self.calibration.reset();
        info!("Waiting for calibration from {}", self.device);
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    /// Lines waiting for the next archival flush.
    pub fn pending_upload(&self) -> &[RawLine] {
        self.scheduler.pending()
    }

    /// Number of collaborator calls not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub async fn process_line(&mut self, line: RawLine) -> LineOutcome {
        self.process_line_at(line, Instant::now()).await
    }

    /// Process one line, checking the upload gate against `now`.
    pub async fn process_line_at(&mut self, line: RawLine, now: Instant) -> LineOutcome {
        if line.is_blank() {
            self.flush_if_due(now).await;
            return LineOutcome::Blank;
        }
        debug!("Sensor: {}", line.text);

        let outcome = match parse_line(&line.text) {
            ParsedEvent::CalibrationComplete { baseline } => self.on_calibration(baseline, &line),
            ParsedEvent::Measurement { current_value } => {
                self.on_measurement(current_value, line).await
            }
            ParsedEvent::Unrecognized => {
                if self.config.audit_unrecognized {
                    self.audit(&line);
                }
                LineOutcome::Unrecognized
            }
        };

        self.flush_if_due(now).await;
        outcome
    }

    fn on_calibration(&mut self, baseline: u32, line: &RawLine) -> LineOutcome {
        match self.calibration.calibrate(baseline) {
            Some(previous) => info!("Recalibrated: baseline {} -> {}", previous, baseline),
            None => info!("Calibration complete. Baseline: {}", baseline),
        }
        self.notify(calibration_message(baseline));
        self.audit(line);
        LineOutcome::Calibrated { baseline }
    }

    async fn on_measurement(&mut self, current_value: u32, line: RawLine) -> LineOutcome {
        let baseline = match self.calibration.current_baseline() {
            Ok(baseline) => baseline,
            Err(_) => {
                warn!("Sensor not calibrated yet, discarding: {}", line.text);
                return LineOutcome::DiscardedUncalibrated { current_value };
            }
        };

        let thresholds = self.state.thresholds().await;
        let reading = Reading {
            current_value,
            baseline,
            difference: classifier::difference(current_value, baseline),
            tier: classifier::classify(current_value, baseline, &thresholds),
            timestamp: line.received_at,
            device: self.device.clone(),
            raw: line.text.clone(),
            calibrated: true,
        };

        self.publish(SensorEvent::SensorData(reading.clone()));

        if let Some(alert) = Alert::for_reading(&reading) {
            warn!("{} alert: {}", alert.tier, alert.message);
            self.publish(SensorEvent::Alert(alert));
            if let Some(text) = alert_message(&reading) {
                self.notify(text);
            }
        }

        let store = self.collaborators.store.clone();
        let record = reading.clone();
        self.dispatch("persist reading", async move { store.save(&record).await });

        self.scheduler.push(line);
        LineOutcome::Classified(reading)
    }

    /// Hand the rolling buffer to the archive if the interval has elapsed.
    pub async fn flush_if_due(&mut self, now: Instant) {
        let interval = self.state.upload_interval().await;
        if !self.scheduler.due_for_upload(now, interval) {
            return;
        }

        let batch = self.scheduler.flush(now);
        if batch.is_empty() {
            debug!("Upload interval elapsed with no lines to archive");
            return;
        }

        info!("Uploading {} lines to archive...", batch.len());
        let archive = self.collaborators.archive.clone();
        self.dispatch("archive upload", async move {
            let location = archive.upload(&batch).await?;
            info!("Archived {} lines to {}", batch.len(), location);
            Ok(())
        });
    }

    /// Send a message through the messaging collaborator.
    pub fn notify(&mut self, text: String) {
        let messenger = self.collaborators.messenger.clone();
        self.dispatch("send message", async move { messenger.send(&text).await });
    }

    /// Wait for every outstanding collaborator call.
    pub async fn drain(&mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Err(e) = result {
                warn!("Collaborator task aborted: {}", e);
            }
        }
    }

    fn audit(&mut self, line: &RawLine) {
        let store = self.collaborators.store.clone();
        let raw = line.text.clone();
        let timestamp = line.received_at;
        self.dispatch("persist audit line", async move {
            store.save_audit_line(&raw, timestamp).await
        });
    }

    fn publish(&self, event: SensorEvent) {
        let name = event.name();
        if let Err(e) = self.collaborators.broadcaster.publish(event) {
            warn!("Failed to broadcast {}: {}", name, e);
        }
    }

    fn dispatch<F>(&mut self, what: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.reap();
        self.in_flight.spawn(async move {
            if let Err(e) = task.await {
                warn!("Failed to {} (dropped): {}", what, e);
            }
        });
    }

    // Collect finished tasks without waiting
    fn reap(&mut self) {
        while let Some(Some(result)) = self.in_flight.join_next().now_or_never() {
            if let Err(e) = result {
                warn!("Collaborator task aborted: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(current_value: u32, baseline: u32, tier: RiskTier) -> Reading {
        Reading {
            current_value,
            baseline,
            difference: i64::from(current_value) - i64::from(baseline),
            tier,
            timestamp: Utc::now(),
            device: "COM3".to_string(),
            raw: format!("Valor actual: {}", current_value),
            calibrated: true,
        }
    }

    #[test]
    fn test_alert_messages() {
        let danger = alert_message(&reading(200, 120, RiskTier::Danger)).unwrap();
        assert!(danger.contains("DANGER"));
        assert!(danger.contains("80 points above baseline (120)"));
        assert!(danger.contains("Current value: 200"));

        let caution = alert_message(&reading(150, 120, RiskTier::Caution)).unwrap();
        assert!(caution.contains("Caution"));
        assert!(caution.contains("30 points"));

        assert!(alert_message(&reading(121, 120, RiskTier::Normal)).is_none());
    }

    #[test]
    fn test_notice_texts() {
        assert_eq!(calibration_message(120), "✅ Sensor calibrated. Baseline: 120");
        assert!(startup_message("/dev/ttyACM0").ends_with("/dev/ttyACM0"));
    }

    #[test]
    fn test_default_config_audits() {
        assert!(PipelineConfig::default().audit_unrecognized);
        assert!(!PipelineConfig::default().with_audit_unrecognized(false).audit_unrecognized);
    }
}
