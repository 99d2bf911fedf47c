//! Slow-start policy validation (§4.5).

use thiserror::Error;

use crate::dag::SlowStart;
use crate::resource::SlowStartPolicy as SlowStartPolicySpec;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlowStartError {
    #[error("slow start window {0:?} must be a positive duration")]
    InvalidWindow(String),
    #[error("slow start aggression {0:?} must be a positive number")]
    InvalidAggression(String),
    #[error("slow start min-weight-percent must be between 0 and 100, got {0}")]
    InvalidMinWeightPercent(i32),
}

/// Window must be a positive duration, aggression a positive float,
/// min-weight-percent between 0 and 100 (§4.5).
pub fn validate(spec: &SlowStartPolicySpec) -> Result<SlowStart, SlowStartError> {
    let window = crate::duration::parse_strict(&spec.window)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| SlowStartError::InvalidWindow(spec.window.clone()))?;

    let aggression = match &spec.aggression {
        None => 1.0,
        Some(s) => {
            let v: f64 = s
                .parse()
                .map_err(|_| SlowStartError::InvalidAggression(s.clone()))?;
            if v <= 0.0 {
                return Err(SlowStartError::InvalidAggression(s.clone()));
            }
            v
        }
    };

    let min_weight_percent = spec.min_weight_percent.unwrap_or(0);
    if !(0..=100).contains(&min_weight_percent) {
        return Err(SlowStartError::InvalidMinWeightPercent(min_weight_percent));
    }

    Ok(SlowStart {
        window,
        aggression,
        min_weight_percent: min_weight_percent as u8,
    })
}
