//! End-to-end export flow over real sockets

mod common;

use common::*;
use export_courier::start;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn link_delivery_downloads_exactly_once() {
    let running = start(local_config(), FixedPipeline::producing(b"%PDF-1.7"))
        .await
        .unwrap();
    let base = format!("http://{}/", running.http_addr());
    let client = reqwest::Client::new();

    let (status, envelope) = post_export(
        &client,
        &base,
        json!({"fileFormat": "pdf", "fileName": "summary", "html": "[{\"html\":\"<h1>Q3</h1>\"}]"}),
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let url = link_url(&envelope);
    assert!(url.starts_with(&base), "{url} should live under {base}");

    let download = client.get(&url).send().await.unwrap();
    assert_eq!(download.status(), reqwest::StatusCode::OK);
    let headers = download.headers().clone();
    assert_eq!(headers["content-type"], "application/pdf");
    assert_eq!(headers["content-disposition"], "attachment; filename=\"summary.pdf\"");
    assert_eq!(headers["access-control-expose-headers"], "Content-Length");
    assert_eq!(headers["content-length"], "8");
    assert_eq!(&download.bytes().await.unwrap()[..], b"%PDF-1.7");

    assert_not_found(&client, &url).await;

    running.shutdown();
    running.wait().await.unwrap();
}

#[tokio::test]
async fn binary_delivery_returns_bytes_inline() {
    let running = start(local_config(), FixedPipeline::producing(b"\x89PNG\r\n"))
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/", running.http_addr()))
        .json(&json!({"fileFormat": "png", "sendAsBinary": true}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(&response.bytes().await.unwrap()[..], b"\x89PNG\r\n");

    running.shutdown();
    running.wait().await.unwrap();
}

#[tokio::test]
async fn failures_follow_delivery_mode() {
    let running = start(
        local_config(),
        FixedPipeline::failing("chart has no series", "chart has no series\n  at render"),
    )
    .await
    .unwrap();
    let base = format!("http://{}/", running.http_addr());
    let client = reqwest::Client::new();

    let (status, envelope) = post_export(&client, &base, json!({"fileFormat": "svg"})).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(
        envelope,
        json!({"success": false, "msg": "chart has no series", "stack": "chart has no series\n  at render"})
    );

    let (status, envelope) = post_export(
        &client,
        &base,
        json!({"fileFormat": "svg", "sendAsBinary": true}),
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(envelope["success"], false);

    running.shutdown();
    running.wait().await.unwrap();
}

#[tokio::test]
async fn slow_export_times_out_with_408() {
    let mut config = local_config();
    config.server.timeout = Duration::from_millis(100);
    let running = start(config, FixedPipeline::slow(Duration::from_secs(5)))
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{}/", running.http_addr()))
        .json(&json!({"fileFormat": "pdf"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::REQUEST_TIMEOUT);

    running.shutdown();
    running.wait().await.unwrap();
}

#[tokio::test]
async fn request_id_reaches_pipeline_and_response() {
    let running = start(local_config(), std::sync::Arc::new(EchoPipeline))
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{}/", running.http_addr()))
        .header("x-request-id", "trace-42")
        .json(&json!({"fileFormat": "txt", "sendAsBinary": "true"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-42");
    assert_eq!(response.text().await.unwrap(), "txt:trace-42");

    running.shutdown();
    running.wait().await.unwrap();
}

#[tokio::test]
async fn occupied_port_is_skipped_when_search_is_enabled() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken = occupied.local_addr().unwrap().port();

    let mut config = local_config();
    config.server.http_port = taken;
    config.server.find_next_http_port = true;
    let running = start(config, FixedPipeline::producing(b"")).await.unwrap();

    assert_ne!(running.http_addr().port(), taken);
    let banner = reqwest::get(format!("http://{}/", running.http_addr()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(banner, "Export server");

    running.shutdown();
    running.wait().await.unwrap();
}

#[tokio::test]
async fn occupied_port_fails_startup_without_search() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken = occupied.local_addr().unwrap().port();

    let mut config = local_config();
    config.server.http_port = taken;

    let result = start(config, FixedPipeline::producing(b"")).await;

    assert!(matches!(
        result,
        Err(export_courier::Error::Bind { port, .. }) if port == taken
    ));
}
