//! Scripted collaborators and transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use gas_sentinel::serial::LineStream;
use gas_sentinel::{
    AppState, ArchiveUploader, Broadcaster, Collaborators, DeviceDescriptor, IngestPipeline,
    Messenger, MonitorError, PipelineConfig, RawLine, Reading, ReadingStore, Result,
    RuntimeSettings, SensorEvent, SerialTransport, SharedState,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    pub readings: Mutex<Vec<Reading>>,
    pub audits: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().unwrap().clone()
    }

    pub fn audits(&self) -> Vec<String> {
        self.audits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReadingStore for RecordingStore {
    async fn save(&self, reading: &Reading) -> Result<()> {
        if self.fail {
            return Err(MonitorError::collaborator("database unavailable"));
        }
        self.readings.lock().unwrap().push(reading.clone());
        Ok(())
    }

    async fn save_audit_line(&self, raw: &str, _timestamp: DateTime<Utc>) -> Result<()> {
        if self.fail {
            return Err(MonitorError::collaborator("database unavailable"));
        }
        self.audits.lock().unwrap().push(raw.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub fail: bool,
    pub attempts: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, text: &str) -> Result<()> {
        self.attempts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(MonitorError::collaborator("bot unreachable"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingArchive {
    pub fail: bool,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingArchive {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveUploader for RecordingArchive {
    async fn upload(&self, batch: &[RawLine]) -> Result<String> {
        self.batches
            .lock()
            .unwrap()
            .push(batch.iter().map(|l| l.text.clone()).collect());
        if self.fail {
            return Err(MonitorError::collaborator("object storage rejected upload"));
        }
        Ok(format!("memory://batch/{}", self.batches.lock().unwrap().len()))
    }
}

#[derive(Default)]
pub struct RecordingBroadcaster {
    pub events: Mutex<Vec<SensorEvent>>,
}

impl RecordingBroadcaster {
    pub fn events(&self) -> Vec<SensorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SensorEvent::SensorData(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SensorEvent::Alert(_)))
            .count()
    }

    pub fn statuses(&self) -> Vec<gas_sentinel::ConnectionStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SensorEvent::ConnectionStatus(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, event: SensorEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// All collaborators for one test, plus the shared state.
pub struct Harness {
    pub state: SharedState,
    pub store: Arc<RecordingStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub archive: Arc<RecordingArchive>,
    pub broadcaster: Arc<RecordingBroadcaster>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(
            RecordingStore::default(),
            RecordingMessenger::default(),
            RecordingArchive::default(),
        )
    }

    pub fn with_parts(
        store: RecordingStore,
        messenger: RecordingMessenger,
        archive: RecordingArchive,
    ) -> Self {
        Self {
            state: AppState::shared(RuntimeSettings::default()),
            store: Arc::new(store),
            messenger: Arc::new(messenger),
            archive: Arc::new(archive),
            broadcaster: Arc::new(RecordingBroadcaster::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            messenger: self.messenger.clone(),
            archive: self.archive.clone(),
            broadcaster: self.broadcaster.clone(),
        }
    }

    pub fn pipeline(&self) -> IngestPipeline {
        self.pipeline_with(PipelineConfig::default())
    }

    pub fn pipeline_with(&self, config: PipelineConfig) -> IngestPipeline {
        let mut pipeline = IngestPipeline::new(self.state.clone(), self.collaborators(), config);
        pipeline.begin_connection("/dev/ttyTEST0");
        pipeline
    }
}

/// How a scripted device responds to `open`.
#[derive(Clone)]
pub enum OpenScript {
    Fail(&'static str),
    /// Never acknowledges; exercises the connect timeout
    Hang,
    /// Opens, yields these lines, then closes
    Lines(Vec<&'static str>),
    /// Opens, yields these lines, then reports a transport error
    LinesThenError(Vec<&'static str>),
    /// Opens, yields these lines, then stays open
    LinesThenIdle(Vec<&'static str>),
}

/// Serial transport that replays scripts per device.
#[derive(Default)]
pub struct ScriptedTransport {
    devices: Vec<DeviceDescriptor>,
    scripts: Mutex<HashMap<String, VecDeque<OpenScript>>>,
    pub attempts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device that behaves as `scripts` on successive opens.
    pub fn device(mut self, descriptor: DeviceDescriptor, scripts: Vec<OpenScript>) -> Self {
        self.scripts
            .get_mut()
            .unwrap()
            .insert(descriptor.id.clone(), scripts.into());
        self.devices.push(descriptor);
        self
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

fn lines(lines: Vec<&'static str>) -> impl futures_util::Stream<Item = io::Result<String>> + Send {
    stream::iter(lines.into_iter().map(|l| Ok(l.to_string())))
}

#[async_trait]
impl SerialTransport for ScriptedTransport {
    fn list(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self.devices.clone())
    }

    async fn open(&self, device: &str, _baud_rate: u32) -> Result<LineStream> {
        self.attempts.lock().unwrap().push(device.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(device)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(OpenScript::Fail("device not present"));

        match script {
            OpenScript::Fail(reason) => Err(MonitorError::open_error(device, reason)),
            OpenScript::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            OpenScript::Lines(l) => Ok(lines(l).boxed()),
            OpenScript::LinesThenError(l) => Ok(lines(l)
                .chain(stream::once(async {
                    Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
                }))
                .boxed()),
            OpenScript::LinesThenIdle(l) => Ok(lines(l).chain(stream::pending()).boxed()),
        }
    }
}

pub fn usb(id: &str, vendor_id: &str, manufacturer: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        id: id.to_string(),
        vendor_id: Some(vendor_id.to_string()),
        product_id: Some("0043".to_string()),
        manufacturer: Some(manufacturer.to_string()),
        product: None,
    }
}

pub fn plain(id: &str) -> DeviceDescriptor {
    DeviceDescriptor::from_path(id)
}
