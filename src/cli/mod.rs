//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Meter load tester - drives concurrent workers against the meter usage endpoint
///
/// Every option can also come from a `LOAD_*` environment variable or a `.env`
/// file; flags given on the command line win.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mlt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Number of concurrent workers
    #[arg(short = 'N', long = "nb-children", value_name = "COUNT")]
    pub nb_children: Option<u32>,

    /// Sequential requests per worker
    #[arg(short = 'M', long = "nb-iterations", value_name = "COUNT")]
    pub nb_iterations: Option<u32>,

    /// Target server host or IP
    #[arg(short = 'S', long = "server-ip", value_name = "HOST")]
    pub server_ip: Option<String>,

    /// Target server port
    #[arg(short = 'P', long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Connection policy: REUSE_SESSION or NO_REUSE_SESSION
    #[arg(short = 'C', long = "connection-mode", value_name = "MODE")]
    pub connection_mode: Option<String>,

    /// Directory receiving the result files
    #[arg(short = 'D', long = "output-directory", value_name = "DIR")]
    pub output_directory: Option<PathBuf>,

    /// Log level: TRACE, DEBUG, INFO, WARN, ERR
    #[arg(short = 'L', long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format: console, json, compact
    #[arg(long = "log-format", value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long = "request-timeout", value_name = "SECONDS")]
    pub request_timeout: Option<u64>,

    /// Give up on a worker that has not reported after this many seconds
    #[arg(long = "harvest-timeout", value_name = "SECONDS")]
    pub harvest_timeout: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// List the supported LOAD_* environment variables and exit
    #[arg(long, conflicts_with = "env_example")]
    pub env_help: bool,

    /// Print a commented example .env file and exit
    #[arg(long)]
    pub env_example: bool,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

/// Detect terminal color support from the environment
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    std::env::var("CI").is_err()
}
