//! Main application orchestration and execution

use crate::{
    cli::Cli,
    client::HttpClientFactory,
    config::{display_config_summary, load_config, test_server_connectivity, validate_config},
    defaults,
    error::Result,
    executor::{Orchestrator, RunOutcome},
    logging::LoggerFactory,
    models::AppConfig,
    output::RunSummaryFormatter,
};
use std::sync::Arc;

/// Main application struct that wires configuration, logging and the harness
pub struct App {
    cli: Cli,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load configuration and run it
    pub async fn run(self) -> Result<RunOutcome> {
        let config = load_config(self.cli.clone())?;
        self.run_with(config).await
    }

    /// Run an already built configuration
    pub async fn run_with(self, config: AppConfig) -> Result<RunOutcome> {
        let use_color = config.enable_color && self.cli.use_colors();
        let loggers = LoggerFactory::new(config.clone());
        let logger = Arc::new(loggers.create_logger("LOAD").await);

        logger.debug(&format!("{} v{}", crate::PKG_NAME, crate::VERSION))
            .field("session_id", loggers.session_id())
            .log()
            .await;
        crate::log_debug!(logger, "{}", display_config_summary(&config));

        for warning in validate_config(&config)? {
            logger.warn(&warning.format(false)).log().await;
        }

        let preflight = test_server_connectivity(&config.run, defaults::DEFAULT_PREFLIGHT_TIMEOUT).await;
        if let Some(error) = preflight.error_message() {
            logger.warn(&format!("Server not reachable before the run, requests will likely fail: {}", error))
                .log()
                .await;
        }

        let run = Arc::new(config.run.clone());
        let request_logger = Arc::new(loggers.create_request_logger().await);
        let error_logger = Arc::new(loggers.create_error_logger().await);
        let client_factory = Arc::new(HttpClientFactory::new(Arc::clone(&run), request_logger));

        let orchestrator = Orchestrator::new(client_factory, Arc::clone(&logger), error_logger);
        let outcome = match orchestrator.run(config.run).await {
            Ok(outcome) => outcome,
            Err(e) => {
                crate::log_error!(logger, "Run failed: {}", e);
                return Err(e);
            }
        };

        println!("{}", RunSummaryFormatter::new(use_color).format(&outcome));

        crate::log_info!(
            logger,
            "Done: {} measurements, min = {} max = {} avg = {} std = {}",
            outcome.measurements,
            outcome.statistics.min,
            outcome.statistics.max,
            outcome.statistics.mean,
            outcome.statistics.stddev
        );

        Ok(outcome)
    }
}
