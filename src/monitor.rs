//! Process supervisor: connect, pump lines, retry on a fixed interval.

use crate::error::Result;
use crate::pipeline::{ingest::startup_message, IngestPipeline};
use crate::serial::PortManager;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Drives one [`PortManager`] and one [`IngestPipeline`] from a single task,
/// so lines are handled strictly in arrival order.
pub struct Monitor {
    ports: PortManager,
    pipeline: IngestPipeline,
    retry_interval: Duration,
}

impl Monitor {
    pub fn new(ports: PortManager, pipeline: IngestPipeline) -> Self {
        let retry_interval = ports.config().retry_interval;
        Self {
            ports,
            pipeline,
            retry_interval,
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn ports(&self) -> &PortManager {
        &self.ports
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut IngestPipeline {
        &mut self.pipeline
    }

    /// Connect once and process lines until the connection ends.
    ///
    /// Returns the device that was used, or the connect failure.
    pub async fn run_session(&mut self) -> Result<String> {
        let device = self.ports.auto_connect().await?;
        info!("Detector running on {}", device);
        self.pipeline.begin_connection(device.clone());
        self.pipeline.notify(startup_message(&device));

        while let Some(line) = self.ports.next_line().await {
            self.pipeline.process_line(line).await;
        }
        Ok(device)
    }

    /// Run sessions back to back until `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let retry = self.retry_interval;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.run_session() => match result {
                    Ok(device) => warn!("Lost connection to {}, retrying in {:?}", device, retry),
                    Err(e) => warn!("{}; retrying in {:?}", e, retry),
                },
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(retry) => info!("Attempting to reconnect..."),
            }
        }

        self.shutdown().await;
    }

    /// Close the port and wait for outstanding collaborator calls.
    pub async fn shutdown(&mut self) {
        self.ports.close();
        self.pipeline.drain().await;
        info!("Monitor stopped");
    }
}
