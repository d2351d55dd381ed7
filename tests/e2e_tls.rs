//! Both listeners share one artifact store

mod common;

use common::*;
use export_courier::start;
use serde_json::json;

fn insecure_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn https_link_is_downloadable_over_either_listener() {
    let running = start(local_tls_config(), FixedPipeline::producing(b"col1,col2\n"))
        .await
        .unwrap();
    let https = running.https_addr().expect("encrypted listener should be up");
    let client = insecure_client();

    let (_, envelope) = post_export(
        &client,
        &format!("https://{https}/"),
        json!({"fileFormat": "csv", "range": "all"}),
    )
    .await;
    let url = link_url(&envelope);
    assert!(url.starts_with(&format!("https://{https}/")), "{url}");

    // Same key, fetched through the plaintext listener
    let key = url.rsplit('/').next().unwrap();
    let plain = format!("http://{}/{key}/", running.http_addr());
    let download = client.get(&plain).send().await.unwrap();
    assert_eq!(download.headers()["content-type"], "application/csv");
    assert_eq!(&download.bytes().await.unwrap()[..], b"col1,col2\n");

    assert_not_found(&client, &url).await;

    running.shutdown();
    running.wait().await.unwrap();
}

#[tokio::test]
async fn missing_certificates_abort_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = local_tls_config();
    config.server.https.cert_dir = dir.path().to_path_buf();

    let result = start(config, FixedPipeline::producing(b"")).await;

    assert!(matches!(result, Err(export_courier::Error::Certificate { .. })));
}

#[tokio::test]
async fn disabled_https_starts_plaintext_only() {
    let running = start(local_config(), FixedPipeline::producing(b""))
        .await
        .unwrap();

    assert!(running.https_addr().is_none());

    running.shutdown();
    running.wait().await.unwrap();
}
