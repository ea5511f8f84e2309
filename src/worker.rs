//! A worker performs a fixed number of sequential, timed requests

use crate::{
    client::RequestClient,
    defaults,
    logging::Logger,
    models::{
        metrics::{epoch_seconds_now, Measurement, WorkerResultSet},
        RunConfig,
    },
};
use std::{sync::Arc, time::Instant};

/// Request path for a worker: a stable source key built from its identity
///
/// `/1.0/kb/meter/<id>_<id mod 200>/visit/load_<id>?withCategoryAggregate=true`
pub fn request_path(worker_id: u32) -> String {
    let bucket = worker_id % defaults::MODULO_SOURCE;
    format!(
        "{}/{}_{}/{}/load_{}?withCategoryAggregate=true",
        defaults::METER_PATH_PREFIX,
        worker_id,
        bucket,
        defaults::METER_CATEGORY,
        worker_id
    )
}

/// Room reserved for a worker's results; larger runs grow the buffer as they go
fn initial_capacity(iterations: u32) -> usize {
    (iterations as usize).min(defaults::MAX_PREALLOCATED)
}

/// Headers sent with every request
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), defaults::AUTHORIZATION.to_string()),
        (defaults::CREATED_BY_HEADER.to_string(), defaults::CREATED_BY.to_string()),
    ]
}

/// One concurrent execution unit of the harness
pub struct Worker {
    worker_id: u32,
    config: Arc<RunConfig>,
    client: Box<dyn RequestClient>,
    logger: Arc<Logger>,
    path: String,
    headers: Vec<(String, String)>,
}

impl Worker {
    pub fn new(worker_id: u32, config: Arc<RunConfig>, client: Box<dyn RequestClient>, logger: Arc<Logger>) -> Self {
        Self {
            worker_id,
            config,
            client,
            logger,
            path: request_path(worker_id),
            headers: default_headers(),
        }
    }

    pub fn worker_id(&self) -> u32 {
        self.worker_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run every iteration in order and hand back the measurements
    ///
    /// Consumes the worker; its client is closed before returning.
    pub async fn do_work(mut self) -> WorkerResultSet {
        let iterations = self.config.iterations_per_worker;
        self.logger.debug(&format!("Starting worker {} with nb_iterations = {}", self.worker_id, iterations))
            .field("worker_id", self.worker_id)
            .field("path", &self.path)
            .log()
            .await;

        let mut results = WorkerResultSet::with_capacity(self.worker_id, initial_capacity(iterations));
        for iteration in 0..iterations {
            let measurement = self.do_one_iteration().await;
            self.logger.trace(&format!("worker {} : iteration {} done", self.worker_id, iteration + 1))
                .measurement(&measurement)
                .log()
                .await;
            results.push(measurement);
        }

        self.client.close().await;

        self.logger.debug(&format!("Worker {} finished with {} measurements", self.worker_id, results.len()))
            .field("worker_id", self.worker_id)
            .field("failed", results.failed_count())
            .log()
            .await;

        results
    }

    async fn do_one_iteration(&mut self) -> Measurement {
        let timestamp = epoch_seconds_now();
        let started = Instant::now();
        let outcome = self.client.post(&self.path, None, &self.headers).await;
        let duration = started.elapsed().as_secs_f64();

        Measurement::with_status(timestamp, duration, outcome.call_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::RequestOutcome, types::CallStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted client recording every call
    struct ScriptedClient {
        outcomes: Vec<RequestOutcome>,
        calls: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl RequestClient for ScriptedClient {
        async fn post(&mut self, path: &str, body: Option<String>, headers: &[(String, String)]) -> RequestOutcome {
            assert!(body.is_none());
            assert_eq!(headers.len(), 3);
            self.calls.lock().unwrap().push(path.to_string());
            let index = (self.calls.lock().unwrap().len() - 1) % self.outcomes.len();
            self.outcomes[index].clone()
        }

        async fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path(1), "/1.0/kb/meter/1_1/visit/load_1?withCategoryAggregate=true");
        assert_eq!(request_path(200), "/1.0/kb/meter/200_0/visit/load_200?withCategoryAggregate=true");
        assert_eq!(request_path(403), "/1.0/kb/meter/403_3/visit/load_403?withCategoryAggregate=true");
    }

    #[test]
    fn test_initial_capacity_is_capped() {
        assert_eq!(initial_capacity(1), 1);
        assert_eq!(initial_capacity(5_000), 5_000);
        assert_eq!(initial_capacity(4_000_000_000), defaults::MAX_PREALLOCATED);
    }

    #[test]
    fn test_default_headers() {
        let headers = default_headers();
        assert!(headers.contains(&("Content-Type".to_string(), "application/json".to_string())));
        assert!(headers.contains(&("Authorization".to_string(), "Basic Ym9iOmxhemFy".to_string())));
        assert!(headers.contains(&("X-Killbill-CreatedBy".to_string(), "meter_load_test".to_string())));
    }

    #[tokio::test]
    async fn test_do_work_runs_all_iterations_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));
        let client = ScriptedClient {
            outcomes: vec![
                RequestOutcome::Success { status_code: 200 },
                RequestOutcome::ProtocolError { status_code: 500, message: "boom".into() },
                RequestOutcome::TransportError { message: "reset".into() },
            ],
            calls: Arc::clone(&calls),
            closed: Arc::clone(&closed),
        };

        let config = Arc::new(RunConfig::new(1, 3, "127.0.0.1", 8080, "."));
        let worker = Worker::new(5, config, Box::new(client), Arc::new(Logger::silent("WORKER")));
        assert_eq!(worker.worker_id(), 5);
        assert_eq!(worker.path(), request_path(5));

        let results = worker.do_work().await;

        assert_eq!(results.worker_id, 5);
        assert_eq!(results.len(), 3);
        assert_eq!(results.failed_count(), 2);
        assert_eq!(
            results.measurements.iter().map(|m| m.status).collect::<Vec<_>>(),
            vec![CallStatus::Success, CallStatus::ProtocolError, CallStatus::TransportError]
        );

        // Strict iteration order: timestamps never go backwards
        for pair in results.measurements.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        assert!(results.measurements.iter().all(|m| m.duration >= 0.0));

        assert_eq!(calls.lock().unwrap().len(), 3);
        assert!(calls.lock().unwrap().iter().all(|p| p == &request_path(5)));
        assert!(*closed.lock().unwrap());
    }
}
