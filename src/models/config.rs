//! Run configuration data model and validation

use crate::logging::{LogFormat, LogLevel};
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Connection lifecycle used by every worker's request client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionMode {
    /// One connection opened lazily and kept for all calls of a worker
    Reuse,
    /// A fresh connection for every call
    #[default]
    PerRequest,
}

impl ConnectionMode {
    /// Name accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Reuse => "REUSE_SESSION",
            ConnectionMode::PerRequest => "NO_REUSE_SESSION",
        }
    }

    /// Whether each call must open a new connection
    pub fn fresh_connection(&self) -> bool {
        matches!(self, ConnectionMode::PerRequest)
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "REUSE" | "REUSE_SESSION" => Ok(ConnectionMode::Reuse),
            "PER_REQUEST" | "NO_REUSE" | "NO_REUSE_SESSION" => Ok(ConnectionMode::PerRequest),
            _ => Err(AppError::parse(format!(
                "Invalid connection mode '{}': expected REUSE_SESSION or NO_REUSE_SESSION",
                s
            ))),
        }
    }
}

/// Immutable description of one load run
///
/// Built once at startup and shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of concurrent workers
    pub worker_count: u32,

    /// Sequential requests performed by each worker
    pub iterations_per_worker: u32,

    /// Target server host or IP
    pub host: String,

    /// Target server port
    pub port: u16,

    /// Connection reuse policy
    #[serde(default)]
    pub connection_mode: ConnectionMode,

    /// Directory receiving the `.csv` and `.stat` files
    pub output_directory: PathBuf,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_seconds: u64,

    /// Upper bound on the wait for a single worker's results, if any
    #[serde(default)]
    pub harvest_timeout_seconds: Option<u64>,
}

impl RunConfig {
    /// Create a configuration with the default connection mode and timeouts
    pub fn new<H, P>(
        worker_count: u32,
        iterations_per_worker: u32,
        host: H,
        port: u16,
        output_directory: P,
    ) -> Self
    where
        H: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            worker_count,
            iterations_per_worker,
            host: host.into(),
            port,
            connection_mode: ConnectionMode::default(),
            output_directory: output_directory.into(),
            request_timeout_seconds: default_request_timeout_secs(),
            harvest_timeout_seconds: None,
        }
    }

    /// Set the connection mode
    pub fn with_connection_mode(mut self, mode: ConnectionMode) -> Self {
        self.connection_mode = mode;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_seconds = timeout.as_secs().max(1);
        self
    }

    /// Bound the wait for each worker's results
    pub fn with_harvest_timeout(mut self, timeout: Duration) -> Self {
        self.harvest_timeout_seconds = Some(timeout.as_secs().max(1));
        self
    }

    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Harvest timeout as a Duration
    pub fn harvest_timeout(&self) -> Option<Duration> {
        self.harvest_timeout_seconds.map(Duration::from_secs)
    }

    /// Total number of requests a fully successful run performs
    pub fn expected_measurements(&self) -> u64 {
        u64::from(self.worker_count) * u64::from(self.iterations_per_worker)
    }

    /// Base URL of the target server
    pub fn base_url(&self) -> Result<url::Url> {
        let url = url::Url::parse(&format!("http://{}:{}", self.host, self.port))?;
        Ok(url)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(AppError::config("Worker count must be greater than 0"));
        }

        if self.iterations_per_worker == 0 {
            return Err(AppError::config("Iterations per worker must be greater than 0"));
        }

        if self.host.trim().is_empty() {
            return Err(AppError::config("Server host cannot be empty"));
        }

        if self.port == 0 {
            return Err(AppError::config("Server port must be greater than 0"));
        }

        self.base_url()
            .map_err(|e| AppError::config(format!("Invalid server address '{}:{}': {}", self.host, self.port, e)))?;

        if self.request_timeout_seconds == 0 {
            return Err(AppError::config("Request timeout must be greater than 0"));
        }

        if self.harvest_timeout_seconds == Some(0) {
            return Err(AppError::config("Harvest timeout must be greater than 0"));
        }

        if self.output_directory.as_os_str().is_empty() {
            return Err(AppError::config("Output directory cannot be empty"));
        }

        if !self.output_directory.is_dir() {
            return Err(AppError::config(format!(
                "Output directory '{}' does not exist or is not a directory",
                self.output_directory.display()
            )));
        }

        Ok(())
    }
}

fn default_request_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

/// Complete application configuration: the run itself plus logging settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub run: RunConfig,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub enable_color: bool,
}

impl AppConfig {
    /// Wrap a run configuration with default logging settings
    pub fn new(run: RunConfig) -> Self {
        Self {
            run,
            log_level: LogLevel::Info,
            log_format: LogFormat::Console,
            enable_color: crate::defaults::DEFAULT_ENABLE_COLOR,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.run.validate()
    }
}
