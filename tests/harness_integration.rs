//! End-to-end harness tests against a mock meter server
//!
//! Real HTTP clients, real tokio workers, real output files; only the server
//! is simulated.

use meter_load_tester::{
    logging::{ErrorEventLogger, Logger, RequestLogger},
    AppError, ConnectionMode, HttpClientFactory, Orchestrator, RunConfig,
};
use std::{fs, future::Future, sync::Arc, time::Duration};
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path_regex, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn orchestrator_for(config: &RunConfig) -> Orchestrator {
    let request_logger = Arc::new(RequestLogger::new(Logger::silent("HTTP")));
    let factory = HttpClientFactory::new(Arc::new(config.clone()), request_logger);
    Orchestrator::new(
        Arc::new(factory),
        Arc::new(Logger::silent("LOAD")),
        Arc::new(ErrorEventLogger::new(Logger::silent("ERR"))),
    )
}

fn never() -> impl Future<Output = ()> {
    std::future::pending()
}

fn config_for(server: &MockServer, dir: &TempDir, workers: u32, iterations: u32) -> RunConfig {
    let address = server.address();
    RunConfig::new(workers, iterations, address.ip().to_string(), address.port(), dir.path())
}

fn read_csv(path: &std::path::Path) -> Vec<(i64, u64)> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let (second, count) = line.split_once(',').unwrap();
            (second.parse().unwrap(), count.parse().unwrap())
        })
        .collect()
}

fn read_stat(path: &std::path::Path) -> Vec<(String, f64)> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let (label, value) = line.split_once(" = ").unwrap();
            (label.to_string(), value.parse().unwrap())
        })
        .collect()
}

async fn mount_meter_endpoint(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/1\.0/kb/meter/\d+_\d+/visit/load_\d+$"))
        .and(query_param("withCategoryAggregate", "true"))
        .and(header("x-killbill-createdby", "meter_load_test"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_request_run_produces_both_files() {
    let server = MockServer::start().await;
    mount_meter_endpoint(&server, 200, 12).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, 3, 4);

    let outcome = orchestrator_for(&config).run_until(config, never()).await.unwrap();

    assert_eq!(outcome.measurements, 12);
    assert_eq!(outcome.failed_requests, 0);

    let rows = read_csv(&dir.path().join("test_3_4.csv"));
    assert_eq!(rows.iter().map(|(_, c)| c).sum::<u64>(), 12);
    assert!(rows.windows(2).all(|w| w[0].0 < w[1].0));
    assert!(rows.iter().all(|(_, c)| *c > 0));

    let stat = read_stat(&dir.path().join("test_3_4.stat"));
    let labels: Vec<&str> = stat.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels, vec!["min", "max", "avg", "std"]);
    let (min, max, avg, std) = (stat[0].1, stat[1].1, stat[2].1, stat[3].1);
    assert!(min <= avg && avg <= max);
    assert!(std >= 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reuse_run_collects_every_measurement() {
    let server = MockServer::start().await;
    mount_meter_endpoint(&server, 201, 20).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, 4, 5).with_connection_mode(ConnectionMode::Reuse);

    let outcome = orchestrator_for(&config).run_until(config, never()).await.unwrap();

    assert_eq!(outcome.measurements, 20);
    assert_eq!(outcome.series.total(), 20);
    assert_eq!(outcome.workers_harvested, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_server_errors_are_timed_and_counted() {
    let server = MockServer::start().await;
    mount_meter_endpoint(&server, 500, 6).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, 2, 3);

    let outcome = orchestrator_for(&config).run_until(config, never()).await.unwrap();

    assert_eq!(outcome.measurements, 6);
    assert_eq!(outcome.failed_requests, 6);
    assert!(dir.path().join("test_2_3.stat").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unreachable_server_still_produces_statistics() {
    let address = {
        let server = MockServer::start().await;
        *server.address()
    };
    let dir = TempDir::new().unwrap();
    let config = RunConfig::new(2, 2, address.ip().to_string(), address.port(), dir.path());

    let outcome = orchestrator_for(&config).run_until(config, never()).await.unwrap();

    assert_eq!(outcome.measurements, 4);
    assert_eq!(outcome.failed_requests, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interrupt_keeps_partial_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/1\.0/kb/meter/1_1/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/1\.0/kb/meter/2_2/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, 2, 2);

    let outcome = orchestrator_for(&config)
        .run_until(config, tokio::time::sleep(Duration::from_secs(2)))
        .await
        .unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.workers_harvested, 1);
    assert_eq!(outcome.measurements, 2);
    assert_eq!(read_csv(&dir.path().join("test_2_2.csv")).iter().map(|(_, c)| c).sum::<u64>(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_nothing_collected_is_statistics_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, 1, 1);

    let result = orchestrator_for(&config)
        .run_until(config, tokio::time::sleep(Duration::from_millis(500)))
        .await;

    assert!(matches!(result, Err(AppError::Statistics(_))));
    assert!(dir.path().join("test_1_1.csv").exists());
    assert!(!dir.path().join("test_1_1.stat").exists());
}
