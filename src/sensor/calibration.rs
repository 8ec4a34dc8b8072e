//! Per-connection calibration state.

use crate::error::{MonitorError, Result};

/// Baseline established by the device's own calibration routine.
///
/// A fresh state is uncalibrated. The newest calibration always wins, and
/// [`CalibrationState::reset`] is called whenever a new connection opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalibrationState {
    baseline: Option<u32>,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a calibration, overwriting any previous baseline.
    pub fn calibrate(&mut self, baseline: u32) -> Option<u32> {
        self.baseline.replace(baseline)
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    /// Baseline for the current connection.
    pub fn current_baseline(&self) -> Result<u32> {
        self.baseline.ok_or(MonitorError::NotCalibrated)
    }

    /// Forget the baseline.
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}
