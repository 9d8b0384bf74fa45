//! Latency instrumentation observed through HTTP.

use std::time::Duration;

use key_service_server::KeyOperation;
use reqwest::StatusCode;

mod common;

use common::{api_url, client, metrics_url, start_server, test_config, SleepyKeyService};

#[tokio::test]
async fn slow_handler_records_at_least_its_sleep() {
    let mut server = start_server(
        test_config(),
        SleepyKeyService::new(Duration::from_millis(10)),
    )
    .await;

    let res = client()
        .post(api_url(&server, "/api/derive_pubkey"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let snapshot = server
        .metrics()
        .histogram("request_duration_derive_pubkey")
        .snapshot();
    assert_eq!(snapshot.count, 1);
    assert!(snapshot.min_us >= 10_000, "{snapshot:?}");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_record_one_sample_each() {
    let mut server = start_server(
        test_config(),
        SleepyKeyService::new(Duration::from_millis(5)),
    )
    .await;
    let client = client();

    let requests: Vec<_> = (0..50)
        .map(|_| tokio::spawn(client.post(api_url(&server, "/api/encrypt")).send()))
        .collect();
    for request in requests {
        assert_eq!(request.await.unwrap().unwrap().status(), StatusCode::OK);
    }

    assert_eq!(server.metrics().histogram("request_duration_encrypt").count(), 50);
    assert_eq!(server.metrics().snapshot().len(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn metrics_listener_exposes_every_route_histogram() {
    let mut server = start_server(test_config(), SleepyKeyService::new(Duration::ZERO)).await;
    let client = client();

    for op in KeyOperation::ALL {
        client.post(api_url(&server, op.path())).send().await.unwrap();
    }
    client.get(api_url(&server, "/readyz")).send().await.unwrap();

    let res = client.get(metrics_url(&server)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();

    for op in KeyOperation::ALL {
        let series = format!("request_duration_{}_count{{service=\"itest\"}} 1", op.route_name());
        assert!(body.contains(&series), "missing {series} in:\n{body}");
    }
    assert!(!body.contains("request_duration_readyz"));

    server.shutdown().await;
}
