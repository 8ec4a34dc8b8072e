//! Notification sink that writes messages to the log.

use super::Messenger;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Messenger used when no chat bot is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMessenger;

impl LogMessenger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Messenger for LogMessenger {
    async fn send(&self, text: &str) -> Result<()> {
        info!(target: "gas_sentinel::notify", "{}", text);
        Ok(())
    }
}
