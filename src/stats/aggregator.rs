//! Reduction of raw measurements into a per-second series and duration summary

use super::duration_statistics;
use crate::{
    error::Result,
    models::metrics::{AggregatedSeries, DurationStatistics, Measurement},
};

/// Stateless reducer over a run's concatenated measurements
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Build the series and the statistics in one call
    ///
    /// Returns a statistics error when `measurements` is empty; use
    /// [`Aggregator::series`] alone if an empty series is acceptable.
    pub fn aggregate(&self, measurements: &[Measurement]) -> Result<(AggregatedSeries, DurationStatistics)> {
        let statistics = self.statistics(measurements)?;
        let series = self.series(measurements);
        Ok((series, statistics))
    }

    /// Count measurements per truncated second
    pub fn series(&self, measurements: &[Measurement]) -> AggregatedSeries {
        let mut series = AggregatedSeries::new();
        for measurement in measurements {
            series.record(measurement.second());
        }
        series
    }

    /// Summary statistics over every duration, failed calls included
    pub fn statistics(&self, measurements: &[Measurement]) -> Result<DurationStatistics> {
        let durations: Vec<f64> = measurements.iter().map(|m| m.duration).collect();
        duration_statistics(&durations)
    }
}
