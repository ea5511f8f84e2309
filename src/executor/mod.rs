//! Run orchestration
//!
//! The [`Orchestrator`] spawns one tokio task per worker, each paired with its
//! own oneshot channel created before the task starts. Results are harvested
//! in spawn order: receive worker 1's result set, wait for worker 1's task to
//! finish, then move on to worker 2, and so on. All workers are already
//! running by then, so this order only shapes the waiting, not the load.
//!
//! Faults during spawn or harvest (interrupts, panicking or lost workers,
//! harvest timeouts) are logged and the run is finalized with whatever was
//! collected.

use crate::{
    client::ClientFactory,
    defaults,
    error::{AppError, Result},
    logging::{ErrorEventLogger, Logger},
    models::{
        metrics::{AggregatedSeries, DurationStatistics, Measurement, WorkerResultSet},
        RunConfig,
    },
    output::{OutputFiles, OutputWriter},
    stats::Aggregator,
    worker::Worker,
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{sync::oneshot, task::JoinHandle};

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub series: AggregatedSeries,
    pub statistics: DurationStatistics,
    pub worker_count: u32,
    pub iterations_per_worker: u32,
    /// Workers whose result set was received
    pub workers_harvested: u32,
    /// Total measurements aggregated
    pub measurements: usize,
    /// Measurements whose call did not succeed
    pub failed_requests: usize,
    /// Whether harvesting stopped early because of a shutdown signal
    pub interrupted: bool,
    pub files: OutputFiles,
}

/// A spawned worker awaiting harvest
struct SpawnedWorker {
    worker_id: u32,
    receiver: oneshot::Receiver<WorkerResultSet>,
    handle: JoinHandle<()>,
}

/// Drives a full run: spawn, harvest, aggregate, write
pub struct Orchestrator {
    factory: Arc<dyn ClientFactory>,
    logger: Arc<Logger>,
    error_logger: Arc<ErrorEventLogger>,
    aggregator: Aggregator,
    writer: OutputWriter,
}

impl Orchestrator {
    pub fn new(factory: Arc<dyn ClientFactory>, logger: Arc<Logger>, error_logger: Arc<ErrorEventLogger>) -> Self {
        Self {
            factory,
            logger,
            error_logger,
            aggregator: Aggregator::new(),
            writer: OutputWriter::new(),
        }
    }

    /// Run until every worker is harvested or Ctrl-C is received
    pub async fn run(&self, config: RunConfig) -> Result<RunOutcome> {
        let logger = Arc::clone(&self.logger);
        let interrupt = async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                logger.warn(&format!("Unable to listen for Ctrl-C, interrupts are disabled: {}", e))
                    .log()
                    .await;
                std::future::pending::<()>().await;
            }
        };
        self.run_until(config, interrupt).await
    }

    /// Run until every worker is harvested or `shutdown` resolves
    ///
    /// Shutdown only stops harvesting; running workers are detached, not
    /// cancelled. Returns a statistics error (after writing an empty CSV) when
    /// no measurement at all was collected.
    pub async fn run_until<F>(&self, config: RunConfig, shutdown: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let config = Arc::new(config);
        let mut collected: Vec<WorkerResultSet> = Vec::with_capacity((config.worker_count as usize).min(defaults::MAX_PREALLOCATED));

        self.logger.info(&format!(
            "Start with server = {}:{}, nb_children = {}, nb_iterations = {}, connection_mode = {}",
            config.host, config.port, config.worker_count, config.iterations_per_worker, config.connection_mode
        ))
            .field("output_directory", config.output_directory.display().to_string())
            .log()
            .await;

        let interrupted = {
            let harvest = self.spawn_and_harvest(&config, &mut collected);
            tokio::pin!(shutdown);

            tokio::select! {
                result = harvest => {
                    if let Err(e) = result {
                        self.error_logger.log_error(&e, Some("Run fault")).await;
                    }
                    false
                }
                _ = &mut shutdown => {
                    self.error_logger
                        .log_error(&AppError::internal("interrupted"), Some("Got Interrupt, finalizing with collected results"))
                        .await;
                    true
                }
            }
        };

        self.finalize(&config, collected, interrupted).await
    }

    async fn spawn_and_harvest(&self, config: &Arc<RunConfig>, collected: &mut Vec<WorkerResultSet>) -> Result<()> {
        let (workers, spawn_error) = self.spawn_workers(config).await;

        for worker in workers {
            self.harvest_one(worker, config.harvest_timeout(), collected).await;
        }

        match spawn_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Spawn every worker; stops at the first client creation failure
    async fn spawn_workers(&self, config: &Arc<RunConfig>) -> (Vec<SpawnedWorker>, Option<AppError>) {
        let mut workers = Vec::with_capacity((config.worker_count as usize).min(defaults::MAX_PREALLOCATED));
        let worker_logger = Arc::new(self.logger.child("WORKER"));

        for worker_id in 1..=config.worker_count {
            self.logger.debug(&format!("Starting worker {}", worker_id)).log().await;

            let client = match self.factory.create_client(worker_id) {
                Ok(client) => client,
                Err(e) => {
                    let error = AppError::worker(format!("Failed to create client for worker {}: {}", worker_id, e));
                    return (workers, Some(error));
                }
            };

            // Channel exists before the task so a fast worker can never miss it
            let (sender, receiver) = oneshot::channel();
            let worker = Worker::new(worker_id, Arc::clone(config), client, Arc::clone(&worker_logger));

            let handle = tokio::spawn(async move {
                let results = worker.do_work().await;
                // A closed receiver means harvesting was abandoned
                let _ = sender.send(results);
            });

            workers.push(SpawnedWorker {
                worker_id,
                receiver,
                handle,
            });
        }

        (workers, None)
    }

    async fn harvest_one(&self, worker: SpawnedWorker, harvest_timeout: Option<Duration>, collected: &mut Vec<WorkerResultSet>) {
        let SpawnedWorker {
            worker_id,
            receiver,
            handle,
        } = worker;

        let received = match harvest_timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    let error = AppError::timeout(format!(
                        "worker {} produced no results within {}s, skipping it",
                        worker_id,
                        limit.as_secs()
                    ));
                    self.error_logger.log_error(&error, Some("Harvest")).await;
                    return;
                }
            },
            None => receiver.await,
        };

        match received {
            Ok(results) => {
                let count = results.len();
                collected.push(results);

                self.logger.debug(&format!("Waiting for worker {}", worker_id)).log().await;
                if let Err(e) = handle.await {
                    self.error_logger.log_error(&AppError::from(e), Some("Join after harvest")).await;
                }
                self.logger.debug(&format!("Worker {} returned with {}", worker_id, count))
                    .field("worker_id", worker_id)
                    .field("measurements", count)
                    .log()
                    .await;
            }
            Err(_) => {
                // Sender dropped without a result: the task ended abnormally
                let error = match handle.await {
                    Err(join_error) => AppError::from(join_error),
                    Ok(()) => AppError::worker(format!("worker {} exited without sending results", worker_id)),
                };
                self.error_logger
                    .log_error(&error, Some(&format!("Worker {} lost", worker_id)))
                    .await;
            }
        }
    }

    async fn finalize(&self, config: &RunConfig, collected: Vec<WorkerResultSet>, interrupted: bool) -> Result<RunOutcome> {
        let workers_harvested = collected.len() as u32;
        let measurements: Vec<Measurement> = collected
            .into_iter()
            .flat_map(|set| set.measurements)
            .collect();
        let failed_requests = measurements.iter().filter(|m| !m.status.is_success()).count();

        if (measurements.len() as u64) < config.expected_measurements() {
            crate::log_warn!(
                self.logger,
                "Collected {} of {} expected measurements",
                measurements.len(),
                config.expected_measurements()
            );
        }

        match self.aggregator.aggregate(&measurements) {
            Ok((series, statistics)) => {
                let files = self.writer.write(
                    &config.output_directory,
                    &series,
                    &statistics,
                    config.worker_count,
                    config.iterations_per_worker,
                )?;

                self.logger.debug(&format!(
                    "durations min = {} max = {} avg = {} std = {}",
                    statistics.min, statistics.max, statistics.mean, statistics.stddev
                ))
                    .log()
                    .await;

                Ok(RunOutcome {
                    series,
                    statistics,
                    worker_count: config.worker_count,
                    iterations_per_worker: config.iterations_per_worker,
                    workers_harvested,
                    measurements: measurements.len(),
                    failed_requests,
                    interrupted,
                    files,
                })
            }
            Err(error) => {
                let series = self.aggregator.series(&measurements);
                let csv = self.writer.write_series(
                    &config.output_directory,
                    &series,
                    config.worker_count,
                    config.iterations_per_worker,
                )?;
                self.logger.warn(&format!(
                    "No statistics for this run, wrote series only to {}",
                    csv.display()
                ))
                    .log()
                    .await;
                Err(error)
            }
        }
    }
}
