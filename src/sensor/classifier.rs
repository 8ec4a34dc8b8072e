//! Threshold-based risk classification.

use crate::sensor::data::{RiskTier, Thresholds};

/// Signed difference between a measurement and the baseline.
pub fn difference(current_value: u32, baseline: u32) -> i64 {
    i64::from(current_value) - i64::from(baseline)
}

/// Map a measurement to a tier. Readings below baseline are normal.
pub fn classify(current_value: u32, baseline: u32, thresholds: &Thresholds) -> RiskTier {
    let diff = difference(current_value, baseline);
    if diff >= i64::from(thresholds.danger()) {
        RiskTier::Danger
    } else if diff >= i64::from(thresholds.caution()) {
        RiskTier::Caution
    } else {
        RiskTier::Normal
    }
}
