use super::*;
use crate::artifacts::ArtifactStore;
use crate::lifecycle::ExportController;
use crate::pipeline::test_helpers::ScriptedPipeline;
use axum::body::{Body, Bytes, to_bytes};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;


const HOST: &str = "localhost:8080";

/// Defaults, minus the encrypted listener
fn test_config() -> Config {
    let mut config = Config::default();
    config.server.https.enabled = false;
    config
}

/// Router over a scripted pipeline, plus handles for inspecting what happened
fn app_with(pipeline: ScriptedPipeline, config: Config) -> (Router, AppState, Arc<ScriptedPipeline>) {
    let pipeline = Arc::new(pipeline);
    let store = ArtifactStore::new(config.artifacts.ttl, config.artifacts.key_length);
    let controller = Arc::new(ExportController::new(pipeline.clone(), store));
    let state = AppState::new(controller, Arc::new(config));
    (create_router(state.clone()), state, pipeline)
}

fn app(pipeline: ScriptedPipeline) -> (Router, AppState, Arc<ScriptedPipeline>) {
    app_with(pipeline, test_config())
}

fn post_json(uri: &str, body: Value) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("host", HOST)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header("host", HOST)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn cors_header_on_every_response() {
    let (app, _, _) = app(ScriptedPipeline::succeeding(b""));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("host", HOST)
                .header("origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
    assert_eq!(
        header(&response, "access-control-allow-headers"),
        Some("Origin, X-Requested-With, Content-Type, Accept")
    );
}

#[tokio::test]
async fn cors_preflight_allows_standard_headers() {
    let (app, _, _) = app(ScriptedPipeline::succeeding(b""));

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/")
                .header("host", HOST)
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type,x-requested-with")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let allowed = header(&response, "access-control-allow-headers")
        .unwrap()
        .to_ascii_lowercase();
    for name in ["origin", "x-requested-with", "content-type", "accept"] {
        assert!(allowed.contains(name), "{name} not in {allowed}");
    }
}

#[tokio::test]
async fn cors_uses_configured_origin() {
    let mut config = test_config();
    config.cors.origin = "https://app.example.com".into();
    let (app, _, _) = app_with(ScriptedPipeline::succeeding(b""), config);

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(
        header(&response, "access-control-allow-origin"),
        Some("https://app.example.com")
    );
}

#[tokio::test]
async fn cors_disabled_omits_header() {
    let mut config = test_config();
    config.cors.enabled = false;
    let (app, _, _) = app_with(ScriptedPipeline::succeeding(b""), config);

    let response = app.oneshot(get("/")).await.unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn request_id_is_generated_and_echoed() {
    let (app, _, _) = app(ScriptedPipeline::succeeding(b""));

    let response = app.oneshot(get("/")).await.unwrap();

    let id = header(&response, "x-request-id").unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn incoming_request_id_is_kept() {
    let (app, _, pipeline) = app(ScriptedPipeline::succeeding(b"x"));

    let mut request = post_json("/", serde_json::json!({"fileFormat": "pdf"}));
    request
        .headers_mut()
        .insert("x-request-id", "client-chosen-id".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(header(&response, "x-request-id"), Some("client-chosen-id"));
    assert_eq!(pipeline.jobs()[0].request_id, "client-chosen-id");
}

#[tokio::test]
async fn static_resources_are_served_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logo.svg"), "<svg/>").unwrap();

    let mut config = test_config();
    config.resources = Some(dir.path().to_path_buf());
    let (app, _, _) = app_with(ScriptedPipeline::succeeding(b""), config);

    let response = app.oneshot(get("/resources/logo.svg")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"<svg/>");
}
