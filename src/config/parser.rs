//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::{self, EnvManager, EnvOverrides},
    error::{AppError, Result},
    logging::{LogFormat, LogLevel},
    models::{AppConfig, ConnectionMode, RunConfig},
};
use std::{path::PathBuf, time::Duration};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load `.env`, read the environment, apply CLI flags and validate
    pub fn parse(&self) -> Result<AppConfig> {
        EnvManager::load_env_file()?;
        self.parse_with_lookup(|key| std::env::var(key).ok())
    }

    /// Build from the CLI flags and an arbitrary variable lookup; no `.env` loading
    pub fn parse_with_lookup<F>(&self, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = EnvOverrides::from_lookup(lookup)?;
        self.build(overrides)
    }

    fn build(&self, env: EnvOverrides) -> Result<AppConfig> {
        let cli = &self.cli;

        let worker_count = required(cli.nb_children.or(env.nb_children), "--nb-children", env::ENV_NB_CHILDREN)?;
        let iterations = required(cli.nb_iterations.or(env.nb_iterations), "--nb-iterations", env::ENV_NB_ITERATIONS)?;
        let host = required(cli.server_ip.clone().or(env.server_ip), "--server-ip", env::ENV_SERVER_IP)?;
        let port = required(cli.server_port.or(env.server_port), "--server-port", env::ENV_SERVER_PORT)?;
        let output_directory: PathBuf = required(
            cli.output_directory.clone().or(env.output_directory),
            "--output-directory",
            env::ENV_OUTPUT_DIRECTORY,
        )?;

        let connection_mode = match &cli.connection_mode {
            Some(value) => value.parse::<ConnectionMode>()?,
            None => env.connection_mode.unwrap_or_default(),
        };

        let mut run = RunConfig::new(worker_count, iterations, host, port, output_directory)
            .with_connection_mode(connection_mode);

        if let Some(seconds) = cli.request_timeout.or(env.request_timeout) {
            if seconds == 0 {
                return Err(AppError::config("Request timeout must be greater than 0"));
            }
            run = run.with_request_timeout(Duration::from_secs(seconds));
        }

        if let Some(seconds) = cli.harvest_timeout.or(env.harvest_timeout) {
            if seconds == 0 {
                return Err(AppError::config("Harvest timeout must be greater than 0"));
            }
            run = run.with_harvest_timeout(Duration::from_secs(seconds));
        }

        let mut config = AppConfig::new(run);

        config.log_level = match &cli.log_level {
            Some(value) => value.parse::<LogLevel>()?,
            None => env.log_level.unwrap_or(LogLevel::Info),
        };

        config.log_format = match &cli.log_format {
            Some(value) => value.parse::<LogFormat>()?,
            None => env.log_format.unwrap_or(LogFormat::Console),
        };

        config.enable_color = if cli.no_color {
            false
        } else {
            env.enable_color.unwrap_or(crate::defaults::DEFAULT_ENABLE_COLOR)
        };

        config.validate()?;
        Ok(config)
    }
}

fn required<T>(value: Option<T>, flag: &str, variable: &str) -> Result<T> {
    value.ok_or_else(|| AppError::config(format!("Missing required option {} (or {})", flag, variable)))
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<AppConfig> {
    ConfigParser::new(cli).parse()
}

/// Configuration summary for debug output
pub fn display_config_summary(config: &AppConfig) -> String {
    let run = &config.run;
    let mut summary = Vec::new();

    summary.push(format!("Server: {}:{}", run.host, run.port));
    summary.push(format!("Workers: {}", run.worker_count));
    summary.push(format!("Iterations per worker: {}", run.iterations_per_worker));
    summary.push(format!("Connection mode: {}", run.connection_mode));
    summary.push(format!("Output directory: {}", run.output_directory.display()));
    summary.push(format!("Request timeout: {}s", run.request_timeout_seconds));
    match run.harvest_timeout_seconds {
        Some(seconds) => summary.push(format!("Harvest timeout: {}s", seconds)),
        None => summary.push("Harvest timeout: none".to_string()),
    }
    summary.push(format!("Log level: {}", config.log_level.as_str()));
    summary.push(format!("Color Output: {}", config.enable_color));

    summary.join("\n")
}
