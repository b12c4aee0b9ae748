//! Scoring metrics

use offsetfield_core::{Error, Result};

/// Mean of squared differences between `truth` and `predicted`.
pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(Error::InvalidParameter {
            name: "predicted",
            value: predicted.len().to_string(),
            reason: format!("expected {} values to match truth", truth.len()),
        });
    }
    if truth.is_empty() {
        return Err(Error::InsufficientPoints {
            required: 1,
            found: 0,
        });
    }
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    Ok(sum / truth.len() as f64)
}
