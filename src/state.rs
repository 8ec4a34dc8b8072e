//! Shared application state.
//!
//! One [`AppState`] is created by the process and handed (as
//! [`SharedState`]) to the pipeline, the port manager and the web layer.

use crate::error::Result;
use crate::sensor::Thresholds;
use crate::web::hub::EventHub;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

pub type SharedState = Arc<AppState>;

/// Settings that may change while a connection is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub thresholds: Thresholds,
    pub upload_interval: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            upload_interval: Duration::from_secs(crate::DEFAULT_UPLOAD_INTERVAL_SECS),
        }
    }
}

impl RuntimeSettings {
    /// Apply a partial update, validating the resulting thresholds.
    pub fn updated(&self, update: &SettingsUpdate) -> Result<Self> {
        let thresholds = self
            .thresholds
            .updated(update.caution_threshold, update.danger_threshold)?;
        let upload_interval = update
            .upload_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(self.upload_interval);
        Ok(Self {
            thresholds,
            upload_interval,
        })
    }

    pub fn view(&self) -> SettingsView {
        SettingsView {
            caution_threshold: self.thresholds.caution(),
            danger_threshold: self.thresholds.danger(),
            upload_interval_secs: self.upload_interval.as_secs(),
        }
    }
}

/// Partial settings update, as accepted by the config endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub caution_threshold: Option<u32>,
    pub danger_threshold: Option<u32>,
    pub upload_interval_secs: Option<u64>,
}

/// Flat settings representation for the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsView {
    pub caution_threshold: u32,
    pub danger_threshold: u32,
    pub upload_interval_secs: u64,
}

/// Process-wide state owned by the orchestrator.
#[derive(Debug)]
pub struct AppState {
    settings: RwLock<RuntimeSettings>,
    hub: EventHub,
}

impl AppState {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            hub: EventHub::default(),
        }
    }

    pub fn shared(settings: RuntimeSettings) -> SharedState {
        Arc::new(Self::new(settings))
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub async fn settings(&self) -> RuntimeSettings {
        *self.settings.read().await
    }

    pub async fn thresholds(&self) -> Thresholds {
        self.settings.read().await.thresholds
    }

    pub async fn upload_interval(&self) -> Duration {
        self.settings.read().await.upload_interval
    }

    /// Replace the settings atomically; invalid updates leave them untouched.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<RuntimeSettings> {
        let mut guard = self.settings.write().await;
        let next = guard.updated(update)?;
        *guard = next;
        info!(
            "Settings updated: caution={}, danger={}, upload interval={}s",
            next.thresholds.caution(),
            next.thresholds.danger(),
            next.upload_interval.as_secs()
        );
        Ok(next)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RuntimeSettings::default())
    }
}

impl crate::collaborators::Broadcaster for AppState {
    fn publish(&self, event: crate::sensor::SensorEvent) -> Result<()> {
        self.hub.publish(event)
    }
}
