//! Configuration validation rules and preflight checks

use crate::{
    error::Result,
    models::{AppConfig, ConnectionMode, RunConfig},
};
use colored::Colorize;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Workers per CPU above which a warning is emitted
pub const WORKERS_PER_CPU_WARNING: usize = 256;

/// Total measurements above which memory use is flagged
pub const LARGE_RUN_MEASUREMENTS: u64 = 10_000_000;

/// Configuration validator with advisory rules on top of `AppConfig::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate hard rules, then collect advisory warnings
    pub fn validate_comprehensive(config: &AppConfig) -> Result<Vec<ValidationWarning>> {
        config.validate()?;
        Ok(Self::validate_run_shape(&config.run, num_cpus::get()))
    }

    /// Advisory checks on worker count, run size and timeouts
    pub fn validate_run_shape(run: &RunConfig, cpus: usize) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        let worker_limit = cpus.max(1) * WORKERS_PER_CPU_WARNING;
        if run.worker_count as usize > worker_limit {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} workers on {} CPUs exceeds {} per CPU; client-side scheduling may skew latency",
                    run.worker_count, cpus, WORKERS_PER_CPU_WARNING
                ),
            ));
        }

        let total = run.expected_measurements();
        if total > LARGE_RUN_MEASUREMENTS {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Run will keep {} measurements in memory until it ends", total),
            ));
        } else if total > LARGE_RUN_MEASUREMENTS / 100 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Run will perform {} requests", total),
            ));
        }

        if run.connection_mode == ConnectionMode::PerRequest && run.worker_count > 1000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "{} with {} workers opens a connection per request and may exhaust ephemeral ports",
                    ConnectionMode::PerRequest,
                    run.worker_count
                ),
            ));
        }

        if let Some(harvest) = run.harvest_timeout() {
            if harvest < run.request_timeout() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Harvest timeout of {}s is shorter than the request timeout of {}s; healthy workers may be skipped",
                        harvest.as_secs(),
                        run.request_timeout().as_secs()
                    ),
                ));
            }
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        let tag = if use_color {
            match self.level {
                ValidationLevel::Info => tag.blue().to_string(),
                ValidationLevel::Warning => tag.yellow().to_string(),
            }
        } else {
            tag
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &AppConfig) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

/// Preflight check result
#[derive(Debug, Clone)]
pub enum ConnectivityResult {
    Success { connect_time: Duration },
    Failed { error: String },
}

impl ConnectivityResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Try one TCP connection to the target before starting the run
pub async fn test_server_connectivity(run: &RunConfig, timeout: Duration) -> ConnectivityResult {
    let address = format!("{}:{}", run.host, run.port);
    let started = Instant::now();

    match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
        Ok(Ok(_stream)) => ConnectivityResult::Success {
            connect_time: started.elapsed(),
        },
        Ok(Err(e)) => ConnectivityResult::Failed {
            error: format!("{}: {}", address, e),
        },
        Err(_) => ConnectivityResult::Failed {
            error: format!("{}: no connection within {}s", address, timeout.as_secs()),
        },
    }
}
