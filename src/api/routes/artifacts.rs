//! One-time artifact download.

use crate::api::AppState;
use crate::artifacts::Artifact;
use axum::{
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{
            ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
        },
    },
    response::{IntoResponse, Response},
};

/// Body sent for unknown, expired or already-downloaded keys
pub const NOT_FOUND_BODY: &str = "File not found";

/// GET /:key - Download an artifact exactly once
///
/// A miss is answered with 200 and a plain-text body so that clients polling
/// the link do not see an HTTP error.
#[utoipa::path(
    get,
    path = "/{key}",
    tag = "artifacts",
    params(
        ("key" = String, Path, description = "Key issued in the export link")
    ),
    responses(
        (status = 200, description = "The artifact bytes, or `File not found` if the key is unknown, expired or already used")
    )
)]
pub async fn download_artifact(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let Some(artifact) = state.store().take(&key) else {
        tracing::debug!(key = %key, "Artifact not found");
        return (StatusCode::OK, NOT_FOUND_BODY).into_response();
    };

    tracing::info!(
        key = %key,
        format = %artifact.format,
        size_bytes = artifact.bytes.len(),
        "Artifact downloaded"
    );

    artifact_response(artifact)
}

/// HEAD /:key - Check an artifact without consuming it
///
/// Link previewers send HEAD ahead of the real download.
pub async fn check_artifact(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.store().peek(&key) {
        Some(artifact) => artifact_response(artifact),
        None => (StatusCode::OK, NOT_FOUND_BODY).into_response(),
    }
}

fn artifact_response(artifact: Artifact) -> Response {
    let content_type = HeaderValue::from_str(&format!("application/{}", artifact.format))
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, attachment(&artifact.file_name)),
            (CONTENT_LENGTH, HeaderValue::from(artifact.bytes.len())),
            (
                ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static("Content-Length"),
            ),
        ],
        artifact.bytes,
    )
        .into_response()
}

/// `attachment; filename="<name>"`, with quotes and control characters removed
fn attachment(file_name: &str) -> HeaderValue {
    let name: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    HeaderValue::from_bytes(format!("attachment; filename=\"{name}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
