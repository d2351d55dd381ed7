//! Export submission.

use crate::api::AppState;
use crate::api::extract::ExportPayload;
use crate::error::Error;
use crate::lifecycle::{ExportReply, ExportStage};
use crate::transport::{ListenerInfo, Scheme};
use crate::types::{ExportFailureBody, ExportLink, ExportQuery};
use axum::{
    Extension, Json,
    extract::{Host, OriginalUri, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_http::request_id::RequestId;
use url::Url;

/// POST / - Generate an export
///
/// The body is the export request as JSON or a url-encoded form. With
/// `sendAsBinary` the produced bytes are returned inline; otherwise they are
/// parked under a one-time key and a link envelope is returned.
#[utoipa::path(
    post,
    path = "/",
    tag = "export",
    request_body(
        content = crate::types::ExportOptions,
        description = "Export request; `html` and any renderer-specific fields are passed through",
        content_type = "application/json"
    ),
    params(
        ("callback" = Option<String>, Query, description = "JSONP callback wrapping the JSON envelope")
    ),
    responses(
        (status = 200, description = "Link envelope, failure envelope, or the file itself when sendAsBinary is set", body = ExportLink),
        (status = 204, description = "The export was cancelled"),
        (status = 400, description = "Malformed request body", body = crate::error::ApiError),
        (status = 408, description = "The export did not finish within the listener timeout"),
        (status = 413, description = "Request body too large", body = crate::error::ApiError),
        (status = 500, description = "Binary export failed", body = ExportFailureBody)
    )
)]
#[allow(clippy::too_many_arguments)]
pub async fn submit_export(
    State(state): State<AppState>,
    listener: Option<Extension<ListenerInfo>>,
    request_id: Option<Extension<RequestId>>,
    Host(host): Host,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
    ExportPayload(payload): ExportPayload,
) -> Response {
    let request_id = request_id
        .and_then(|Extension(id)| id.header_value().to_str().ok().map(str::to_owned))
        .unwrap_or_else(|| "unassigned".to_string());
    let scheme = listener.map_or(Scheme::Http, |Extension(info)| info.scheme);

    tracing::info!(
        request_id = %request_id,
        stage = %ExportStage::Received,
        %scheme,
        "POST request received"
    );
    tracing::debug!(request_id = %request_id, headers = ?headers, "POST request headers");

    let authority = request_authority(&uri, host);
    let base_url = match Url::parse(&format!("{scheme}://{authority}{}", uri.path())) {
        Ok(url) => url,
        Err(e) => {
            return Error::InvalidRequest(format!(
                "cannot build download URL from host {authority:?}: {e}"
            ))
            .into_response();
        }
    };

    let job = match state.controller.prepare(payload, request_id) {
        Ok(job) => job,
        Err(e) => return e.into_response(),
    };

    let reply = state.controller.run(job, &base_url).await;
    reply_response(reply, query.callback.as_deref())
}

/// Host and port the client addressed
///
/// HTTP/2 carries them in the `:authority` pseudo-header, which ends up in the
/// request URI rather than in a `Host` header. The `Host` extractor falls back
/// to `uri.host()` there and loses the port, so the URI authority wins.
fn request_authority(uri: &Uri, host: String) -> String {
    uri.authority().map_or(host, |authority| authority.as_str().to_owned())
}

/// Encode a lifecycle reply as an HTTP response
fn reply_response(reply: ExportReply, callback: Option<&str>) -> Response {
    let status = reply.status_code();
    match reply {
        ExportReply::Binary(bytes) => (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            )],
            bytes,
        )
            .into_response(),
        ExportReply::Link { url } => envelope(status, &ExportLink { success: true, url }, callback),
        ExportReply::Cancelled => status.into_response(),
        ExportReply::Failed { failure, .. } => envelope(
            status,
            &ExportFailureBody {
                success: false,
                msg: failure.message,
                stack: failure.trace,
            },
            callback,
        ),
    }
}

/// JSON body, or a JSONP script when the caller named a callback
fn envelope<T: Serialize>(status: StatusCode, body: &T, callback: Option<&str>) -> Response {
    let Some(callback) = callback.map(sanitize_callback).filter(|c| !c.is_empty()) else {
        return (status, Json(body)).into_response();
    };

    let json = match serde_json::to_string(body) {
        Ok(json) => json,
        Err(e) => return Error::Serialization(e).into_response(),
    };

    (
        status,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/javascript; charset=utf-8"),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        jsonp_script(&callback, &json),
    )
        .into_response()
}

/// Keep only characters valid in a dotted JavaScript member path
fn sanitize_callback(callback: &str) -> String {
    callback
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
        .collect()
}

fn jsonp_script(callback: &str, json: &str) -> String {
    // U+2028/U+2029 are valid in JSON strings but terminate JavaScript string literals
    let json = json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029");
    format!("/**/ typeof {callback} === 'function' && {callback}({json});")
}
