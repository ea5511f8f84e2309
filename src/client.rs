//! HTTP request client used by workers
//!
//! Each worker owns one [`RequestClient`]. Failures never leave the client:
//! they are logged and returned as a [`RequestOutcome`] so the worker can
//! still record how long the call took.


use crate::{
    error::{AppError, Result},
    logging::RequestLogger,
    models::{ConnectionMode, RunConfig},
    types::CallStatus,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Result of one POST, with every failure already absorbed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 2xx or 3xx status
    Success { status_code: u16 },
    /// Any other status; `message` carries status, method, path and body
    ProtocolError { status_code: u16, message: String },
    /// No response was obtained
    TransportError { message: String },
}

impl RequestOutcome {
    /// Classify an HTTP status code
    pub fn is_success_status(status_code: u16) -> bool {
        (200..400).contains(&status_code)
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Success { status_code } | Self::ProtocolError { status_code, .. } => Some(*status_code),
            Self::TransportError { .. } => None,
        }
    }

    pub fn call_status(&self) -> CallStatus {
        match self {
            Self::Success { .. } => CallStatus::Success,
            Self::ProtocolError { .. } => CallStatus::ProtocolError,
            Self::TransportError { .. } => CallStatus::TransportError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// HTTP client abstraction for workers and tests
#[async_trait]
pub trait RequestClient: Send {
    /// POST `body` to `path` (path and query, relative to the target server)
    async fn post(&mut self, path: &str, body: Option<String>, headers: &[(String, String)]) -> RequestOutcome;

    /// Release any connection held by the client
    async fn close(&mut self);
}

/// Creates one request client per worker
pub trait ClientFactory: Send + Sync {
    fn create_client(&self, worker_id: u32) -> Result<Box<dyn RequestClient>>;
}

/// reqwest-backed client talking to a fixed host and port
///
/// The underlying `reqwest::Client` is built once, when the `MeterClient` is
/// created, so no timed call pays for TLS or pool setup. The connection mode
/// only changes the pool: `Reuse` keeps one idle connection per host,
/// `PerRequest` keeps none and every call dials a fresh connection.
pub struct MeterClient {
    base_url: Url,
    mode: ConnectionMode,
    timeout: Duration,
    /// Dropped by `close`, rebuilt if the client is used again
    client: Option<Client>,
    logger: Arc<RequestLogger>,
}

impl MeterClient {
    /// Create a client for the target described by `config`
    pub fn new(config: &RunConfig, logger: Arc<RequestLogger>) -> Result<Self> {
        let mut meter = Self {
            base_url: config.base_url()?,
            mode: config.connection_mode,
            timeout: config.request_timeout(),
            client: None,
            logger,
        };
        meter.client = Some(meter.build_client()?);
        Ok(meter)
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    /// Whether the client still holds its connection pool
    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn build_client(&self) -> Result<Client> {
        let idle_per_host = if self.mode.fresh_connection() { 0 } else { 1 };

        Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(idle_per_host)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
    }

    fn client(&mut self) -> Result<Client> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => {
                let client = self.build_client()?;
                self.client = Some(client.clone());
                Ok(client)
            }
        }
    }

    async fn send(&mut self, path: &str, body: Option<String>, headers: &[(String, String)]) -> Result<RequestOutcome> {
        let url = self.base_url.join(path)?;
        let client = self.client()?;

        let mut request = client.post(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.body(body.unwrap_or_default());

        let response = request.send().await?;
        let status = response.status();
        let status_code = status.as_u16();

        // Drain the body so the connection can be reused or released cleanly
        let body = response.text().await.unwrap_or_default();

        if RequestOutcome::is_success_status(status_code) {
            Ok(RequestOutcome::Success { status_code })
        } else {
            Ok(RequestOutcome::ProtocolError {
                status_code,
                message: format!(
                    "{}:{}\nMETHOD:POST\nURI:{}\n{}",
                    status_code,
                    status.canonical_reason().unwrap_or(""),
                    path,
                    body
                ),
            })
        }
    }
}

#[async_trait]
impl RequestClient for MeterClient {
    async fn post(&mut self, path: &str, body: Option<String>, headers: &[(String, String)]) -> RequestOutcome {
        let started = Instant::now();
        let outcome = self.send(path, body, headers).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        // Exactly one record per call
        match outcome {
            Ok(RequestOutcome::ProtocolError { status_code, message }) => {
                self.logger
                    .log_failure("POST", path, &AppError::http_request(message.clone()))
                    .await;
                RequestOutcome::ProtocolError { status_code, message }
            }
            Ok(outcome) => {
                self.logger.log_request("POST", path, outcome.status_code(), elapsed_ms).await;
                outcome
            }
            Err(error) => {
                self.logger.log_failure("POST", path, &error).await;
                RequestOutcome::TransportError {
                    message: error.to_string(),
                }
            }
        }
    }

    async fn close(&mut self) {
        self.client = None;
    }
}

/// Factory producing [`MeterClient`]s for a run
pub struct HttpClientFactory {
    config: Arc<RunConfig>,
    logger: Arc<RequestLogger>,
}

impl HttpClientFactory {
    pub fn new(config: Arc<RunConfig>, logger: Arc<RequestLogger>) -> Self {
        Self { config, logger }
    }
}

impl ClientFactory for HttpClientFactory {
    fn create_client(&self, _worker_id: u32) -> Result<Box<dyn RequestClient>> {
        let client = MeterClient::new(&self.config, Arc::clone(&self.logger))?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    fn silent_request_logger() -> Arc<RequestLogger> {
        Arc::new(RequestLogger::new(Logger::silent("HTTP")))
    }

    #[test]
    fn test_status_classification() {
        assert!(RequestOutcome::is_success_status(200));
        assert!(RequestOutcome::is_success_status(201));
        assert!(RequestOutcome::is_success_status(302));
        assert!(RequestOutcome::is_success_status(399));
        assert!(!RequestOutcome::is_success_status(199));
        assert!(!RequestOutcome::is_success_status(404));
        assert!(!RequestOutcome::is_success_status(500));
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = RequestOutcome::Success { status_code: 201 };
        assert!(ok.is_success());
        assert_eq!(ok.status_code(), Some(201));
        assert_eq!(ok.call_status(), CallStatus::Success);

        let protocol = RequestOutcome::ProtocolError { status_code: 500, message: "500".into() };
        assert_eq!(protocol.status_code(), Some(500));
        assert_eq!(protocol.call_status(), CallStatus::ProtocolError);

        let transport = RequestOutcome::TransportError { message: "refused".into() };
        assert_eq!(transport.status_code(), None);
        assert_eq!(transport.call_status(), CallStatus::TransportError);
    }

    #[test]
    fn test_client_is_built_before_any_call() {
        for mode in [ConnectionMode::Reuse, ConnectionMode::PerRequest] {
            let config = RunConfig::new(1, 1, "127.0.0.1", 8080, ".").with_connection_mode(mode);
            let client = MeterClient::new(&config, silent_request_logger()).unwrap();
            assert_eq!(client.mode(), mode);
            assert!(client.is_open());
        }
    }

    #[tokio::test]
    async fn test_close_releases_and_next_call_rebuilds() {
        let config = RunConfig::new(1, 1, "127.0.0.1", 8080, ".").with_connection_mode(ConnectionMode::Reuse);
        let mut client = MeterClient::new(&config, silent_request_logger()).unwrap();

        client.close().await;
        assert!(!client.is_open());
        client.client().unwrap();
        assert!(client.is_open());
    }

    #[test]
    fn test_factory_creates_clients() {
        let config = Arc::new(RunConfig::new(2, 1, "localhost", 9090, "."));
        let factory = HttpClientFactory::new(config, silent_request_logger());
        assert!(factory.create_client(1).is_ok());
        assert!(factory.create_client(2).is_ok());
    }
}
