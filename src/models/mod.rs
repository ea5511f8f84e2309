//! Data models and structures for the load harness

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{AppConfig, ConnectionMode, RunConfig};
pub use metrics::{AggregatedSeries, DurationStatistics, Measurement, WorkerResultSet};
