//! Custom test assertions for E2E tests

use reqwest::StatusCode;
use serde_json::Value;

/// Body the download endpoint sends for unknown or used keys
pub const FILE_NOT_FOUND: &str = "File not found";

/// POST `body` as JSON and decode the JSON envelope
pub async fn post_export(client: &reqwest::Client, url: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("export request should reach the server");
    let status = response.status();
    let envelope = response.json().await.expect("response should be JSON");
    (status, envelope)
}

/// Extract the download URL from a successful link envelope
pub fn link_url(envelope: &Value) -> String {
    assert_eq!(envelope["success"], true, "expected success envelope, got {envelope}");
    envelope["url"]
        .as_str()
        .expect("envelope should carry a url")
        .to_string()
}

/// Fetch `url` and assert the artifact is gone
pub async fn assert_not_found(client: &reqwest::Client, url: &str) {
    let response = client.get(url).send().await.expect("download request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body should be text"), FILE_NOT_FOUND);
}
