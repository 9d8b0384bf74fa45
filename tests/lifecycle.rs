//! Startup, drain and shutdown behaviour over real sockets.

use std::time::{Duration, Instant};

use key_service_server::lifecycle::StageOutcome;
use reqwest::StatusCode;

mod common;

use common::{api_url, client, start_server, test_config, SleepyKeyService};

#[tokio::test]
async fn drain_and_undrain_flip_readiness() {
    let mut server = start_server(test_config(), SleepyKeyService::new(Duration::ZERO)).await;
    let client = client();
    let get = |path: &str| client.get(api_url(&server, path)).send();

    assert_eq!(get("/readyz").await.unwrap().status(), StatusCode::OK);

    assert_eq!(get("/drain").await.unwrap().status(), StatusCode::OK);
    assert_eq!(get("/readyz").await.unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(get("/livez").await.unwrap().status(), StatusCode::OK);

    // Draining twice is a no-op with the same answer.
    assert_eq!(get("/drain").await.unwrap().status(), StatusCode::OK);
    assert_eq!(get("/readyz").await.unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(get("/undrain").await.unwrap().status(), StatusCode::OK);
    let ready = get("/readyz").await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    let body: serde_json::Value = ready.json().await.unwrap();
    assert_eq!(body["status"], "ready");

    assert!(server.shutdown().await.is_clean());
}

#[tokio::test]
async fn readiness_flag_is_shared_with_owner() {
    let mut server = start_server(test_config(), SleepyKeyService::new(Duration::ZERO)).await;
    let client = client();

    server.readiness().set(false);
    let res = client.get(api_url(&server, "/readyz")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    client.get(api_url(&server, "/undrain")).send().await.unwrap();
    assert!(server.readiness().get());

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn admitted_request_survives_drain() {
    let mut server = start_server(
        test_config(),
        SleepyKeyService::new(Duration::from_millis(300)),
    )
    .await;
    let client = client();

    let in_flight = tokio::spawn(client.post(api_url(&server, "/api/encrypt")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let drained = client.get(api_url(&server, "/drain")).send().await.unwrap();
    assert_eq!(drained.status(), StatusCode::OK);

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "encrypt");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_request_finishes_within_budget() {
    let mut server = start_server(
        test_config(),
        SleepyKeyService::new(Duration::from_millis(300)),
    )
    .await;

    let in_flight = tokio::spawn(client().post(api_url(&server, "/api/get_pubkey")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let report = server.shutdown().await;
    assert!(matches!(report.api, StageOutcome::Stopped), "{report:?}");
    assert!(matches!(report.metrics, StageOutcome::Stopped), "{report:?}");

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_is_bounded_by_timeout() {
    let key_service = SleepyKeyService::new(Duration::from_secs(10));
    let mut server = start_server(test_config(), key_service.clone()).await;
    let metrics = server.metrics().clone();

    let in_flight = tokio::spawn(client().post(api_url(&server, "/api/decrypt")).send());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(key_service.calls(), 1);

    let started = Instant::now();
    let report = server.shutdown().await;
    let elapsed = started.elapsed();

    assert!(
        matches!(report.api, StageOutcome::TimedOut { abandoned: 1 }),
        "{report:?}"
    );
    assert!(matches!(report.metrics, StageOutcome::Stopped), "{report:?}");
    assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2_500), "{elapsed:?}");

    // The abandoned request gets no response.
    let outcome = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_err());

    // The aborted handler still emitted its latency sample.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(metrics.histogram("request_duration_decrypt").count(), 1);
}

#[tokio::test]
async fn no_metrics_listener_when_address_empty() {
    let mut config = test_config();
    config.server.metrics_addr = String::new();
    let mut server = start_server(config, SleepyKeyService::new(Duration::ZERO)).await;
    assert_eq!(server.metrics_addr(), None);

    let report = server.shutdown().await;
    assert!(matches!(report.api, StageOutcome::Stopped));
    assert!(matches!(report.metrics, StageOutcome::NotRunning));
    assert!(report.is_clean());
}

#[tokio::test]
async fn listeners_refuse_connections_after_shutdown() {
    let mut server = start_server(test_config(), SleepyKeyService::new(Duration::ZERO)).await;
    let api = server.api_addr().unwrap();
    let metrics = server.metrics_addr().unwrap();

    assert!(server.shutdown().await.is_clean());

    assert!(tokio::net::TcpStream::connect(api).await.is_err());
    assert!(tokio::net::TcpStream::connect(metrics).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn force_closed_http2_stream_is_still_measured() {
    let mut config = test_config();
    config.server.graceful_shutdown_ms = 300;
    let mut server = start_server(config, SleepyKeyService::new(Duration::from_secs(1))).await;
    let metrics = server.metrics().clone();

    let h2 = reqwest::Client::builder()
        .http2_prior_knowledge()
        .no_proxy()
        .build()
        .unwrap();
    let in_flight = tokio::spawn(h2.post(api_url(&server, "/api/encrypt")).send());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let report = server.shutdown().await;
    assert!(
        matches!(report.api, StageOutcome::TimedOut { abandoned: 1 }),
        "{report:?}"
    );
    assert!(in_flight.await.unwrap().is_err());

    // The stream handler may outlive its connection; its sample lands by
    // the time it would have finished.
    let histogram = metrics.histogram("request_duration_encrypt");
    let deadline = Instant::now() + Duration::from_secs(3);
    while histogram.count() == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(histogram.count(), 1);
}
