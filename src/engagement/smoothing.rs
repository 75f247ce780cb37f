//! Smoothing strategies for binary engagement flag series.

use serde::{Deserialize, Serialize};

/// Available smoothing algorithms, chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// Instant binary values: `flag * 100`.
    None,
    /// Scalar 1-D Kalman filter. Smooth without the lag of a moving average,
    /// stable near the series endpoints.
    Kalman,
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::Kalman
    }
}

/// Expected variance in the true engagement state between samples.
const PROCESS_VARIANCE: f64 = 1e-5;
/// Expected measurement noise. Lower trusts measurements more.
const MEASUREMENT_VARIANCE: f64 = 1e-2;

impl Smoothing {
    /// Turn a 0/1 flag series into a percentage series in `[0, 100]`.
    pub fn smooth(&self, flags: &[u8]) -> Vec<f64> {
        match self {
            Smoothing::None => flags.iter().map(|&f| f as f64 * 100.0).collect(),
            Smoothing::Kalman => kalman(flags),
        }
    }
}

fn kalman(flags: &[u8]) -> Vec<f64> {
    if flags.is_empty() {
        return Vec::new();
    }

    let mut estimate = flags[0] as f64 * 100.0;
    let mut error_estimate = 1.0;
    let mut estimates = Vec::with_capacity(flags.len());

    for &flag in flags {
        let measurement = flag as f64 * 100.0;

        // Predict: no transition model, the state just accrues process noise
        error_estimate += PROCESS_VARIANCE;

        // Update: fold in the measurement
        let gain = error_estimate / (error_estimate + MEASUREMENT_VARIANCE);
        estimate += gain * (measurement - estimate);
        error_estimate = (1.0 - gain) * error_estimate;

        estimates.push(estimate);
    }

    estimates
}
