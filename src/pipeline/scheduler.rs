//! Interval gate for archival uploads.

use crate::sensor::RawLine;
use std::time::{Duration, Instant};

/// Rolling buffer of raw lines plus the time of the last flush.
///
/// Polled once per ingested line; it never runs on its own timer.
#[derive(Debug, Clone)]
pub struct UploadScheduler {
    last_flush: Instant,
    buffer: Vec<RawLine>,
}

impl UploadScheduler {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(last_flush: Instant) -> Self {
        Self {
            last_flush,
            buffer: Vec::new(),
        }
    }

    pub fn last_flush(&self) -> Instant {
        self.last_flush
    }

    pub fn push(&mut self, line: RawLine) {
        self.buffer.push(line);
    }

    pub fn pending(&self) -> &[RawLine] {
        &self.buffer
    }

    /// True once `interval` has elapsed since the last flush.
    pub fn due_for_upload(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.last_flush) >= interval
    }

    /// Take the buffered lines and restart the interval at `now`.
    ///
    /// The buffer is empty afterwards whatever happens to the returned batch.
    pub fn flush(&mut self, now: Instant) -> Vec<RawLine> {
        self.last_flush = now;
        std::mem::take(&mut self.buffer)
    }
}

impl Default for UploadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_gate() {
        let t0 = Instant::now();
        let scheduler = UploadScheduler::starting_at(t0);
        let interval = Duration::from_secs(30);

        assert!(!scheduler.due_for_upload(t0, interval));
        assert!(!scheduler.due_for_upload(t0 + Duration::from_secs(29), interval));
        assert!(scheduler.due_for_upload(t0 + Duration::from_secs(30), interval));
        assert!(scheduler.due_for_upload(t0 + Duration::from_secs(31), interval));
    }

    #[test]
    fn test_flush_clears_and_restarts() {
        let t0 = Instant::now();
        let mut scheduler = UploadScheduler::starting_at(t0);
        scheduler.push(RawLine::new("Valor actual: 130"));
        scheduler.push(RawLine::new("Valor actual: 131"));

        let t1 = t0 + Duration::from_secs(30);
        let batch = scheduler.flush(t1);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].text, "Valor actual: 130");
        assert!(scheduler.pending().is_empty());
        assert_eq!(scheduler.last_flush(), t1);
        assert!(!scheduler.due_for_upload(t1 + Duration::from_secs(29), Duration::from_secs(30)));
    }

    #[test]
    fn test_clock_before_last_flush_is_not_due() {
        let t0 = Instant::now() + Duration::from_secs(60);
        let scheduler = UploadScheduler::starting_at(t0);
        assert!(!scheduler.due_for_upload(Instant::now(), Duration::from_secs(30)));
    }
}
