//! Measurement and aggregate data models

use crate::types::CallStatus;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One timed request iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Start of the request, seconds since the Unix epoch
    pub timestamp: f64,
    /// Elapsed time of the request in seconds
    pub duration: f64,
    /// How the request ended
    pub status: CallStatus,
}

impl Measurement {
    /// Create a measurement for a successful call
    pub fn new(timestamp: f64, duration: f64) -> Self {
        Self {
            timestamp,
            duration,
            status: CallStatus::Success,
        }
    }

    /// Create a measurement with an explicit call status
    pub fn with_status(timestamp: f64, duration: f64, status: CallStatus) -> Self {
        Self {
            timestamp,
            duration,
            status,
        }
    }

    /// Whole second the measurement falls into (truncated toward zero)
    pub fn second(&self) -> i64 {
        self.timestamp.trunc() as i64
    }
}

/// Current wall-clock time as fractional seconds since the epoch
pub fn epoch_seconds_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Ordered measurements produced by exactly one worker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerResultSet {
    pub worker_id: u32,
    pub measurements: Vec<Measurement>,
}

impl WorkerResultSet {
    /// Create an empty result set for a worker
    pub fn new(worker_id: u32) -> Self {
        Self {
            worker_id,
            measurements: Vec::new(),
        }
    }

    /// Create an empty result set with room for `capacity` measurements
    pub fn with_capacity(worker_id: u32, capacity: usize) -> Self {
        Self {
            worker_id,
            measurements: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, measurement: Measurement) {
        self.measurements.push(measurement);
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Number of calls that did not succeed
    pub fn failed_count(&self) -> usize {
        self.measurements
            .iter()
            .filter(|m| !m.status.is_success())
            .count()
    }
}

/// Sparse per-second occurrence counts, iterated in ascending second order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    points: BTreeMap<i64, u64>,
}

impl AggregatedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence in `second`, creating the bucket on demand
    pub fn record(&mut self, second: i64) {
        *self.points.entry(second).or_insert(0) += 1;
    }

    /// Count for `second`, if any measurement fell into it
    pub fn get(&self, second: i64) -> Option<u64> {
        self.points.get(&second).copied()
    }

    /// `(second, count)` pairs in ascending second order
    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.points.iter().map(|(second, count)| (*second, *count))
    }

    /// Number of distinct seconds
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.points.values().sum()
    }

    /// First and last observed second
    pub fn span(&self) -> Option<(i64, i64)> {
        let first = self.points.keys().next()?;
        let last = self.points.keys().next_back()?;
        Some((*first, *last))
    }
}

/// Summary of all collected request durations, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

impl DurationStatistics {
    /// Format the four statistics as `label = value` lines
    pub fn to_report_lines(&self) -> [String; 4] {
        [
            format!("min = {}", self.min),
            format!("max = {}", self.max),
            format!("avg = {}", self.mean),
            format!("std = {}", self.stddev),
        ]
    }

    /// Mean in milliseconds, for console output
    pub fn mean_ms(&self) -> f64 {
        self.mean * 1000.0
    }

    /// Standard deviation in milliseconds, for console output
    pub fn stddev_ms(&self) -> f64 {
        self.stddev * 1000.0
    }
}
