//! Meter Load Tester
//!
//! A parallel load-generation and measurement harness. A configurable number of
//! concurrent workers POST to the meter usage endpoint, every call is timed, and
//! the raw timings are reduced into a per-second arrival series and summary
//! latency statistics written next to each other on disk.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use client::{ClientFactory, HttpClientFactory, MeterClient, RequestClient, RequestOutcome};
pub use error::{AppError, Result};
pub use executor::{Orchestrator, RunOutcome};
pub use models::{AggregatedSeries, AppConfig, ConnectionMode, DurationStatistics, Measurement, RunConfig, WorkerResultSet};
pub use output::{OutputFiles, OutputWriter, RunSummaryFormatter};
pub use stats::Aggregator;
pub use worker::Worker;

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values and endpoint constants
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Cap on entries reserved up front for per-worker or per-run buffers
    pub const MAX_PREALLOCATED: usize = 1 << 16;

    /// Number of distinct source buckets a worker id is folded into
    pub const MODULO_SOURCE: u32 = 200;
    pub const METER_PATH_PREFIX: &str = "/1.0/kb/meter";
    pub const METER_CATEGORY: &str = "visit";

    pub const AUTHORIZATION: &str = "Basic Ym9iOmxhemFy";
    pub const CREATED_BY_HEADER: &str = "X-Killbill-CreatedBy";
    pub const CREATED_BY: &str = "meter_load_test";
}
