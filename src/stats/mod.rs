//! Statistics over request durations
//!
//! Free functions over any slice of `f64` durations, plus the
//! [`Aggregator`] that reduces a run's measurements into a per-second series
//! and a [`DurationStatistics`] summary.

pub mod aggregator;

pub use aggregator::Aggregator;

use crate::{
    error::{AppError, Result},
    models::metrics::DurationStatistics,
};

/// Sum of all values; `0.0` for an empty slice
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(sum(values) / values.len() as f64)
}

/// Population variance: squared deviations divided by N (not N - 1)
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let squared: f64 = values.iter().map(|&x| (x - avg).powi(2)).sum();
    Some(squared / values.len() as f64)
}

/// Population standard deviation
pub fn standard_deviation(values: &[f64]) -> Option<f64> {
    population_variance(values).map(f64::sqrt)
}

/// Compute min, max, mean and population standard deviation in one place
///
/// Fails with a statistics error on empty input instead of producing NaN.
pub fn duration_statistics(durations: &[f64]) -> Result<DurationStatistics> {
    if durations.is_empty() {
        return Err(AppError::statistics("cannot compute duration statistics over an empty input"));
    }

    if let Some(bad) = durations.iter().find(|d| !d.is_finite()) {
        return Err(AppError::statistics(format!("non-finite duration in input: {}", bad)));
    }

    let min = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let max = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Rounding in the running sum can push the mean a few ulps outside [min, max]
    let avg = (sum(durations) / durations.len() as f64).clamp(min, max);

    let squared: f64 = durations.iter().map(|&x| (x - avg).powi(2)).sum();
    let stddev = (squared / durations.len() as f64).sqrt();

    Ok(DurationStatistics {
        min,
        max,
        mean: avg,
        stddev,
    })
}
