//! Export request lifecycle
//!
//! Every export request moves through the same stages:
//!
//! ```text
//! RECEIVED ──normalize──▶ DELEGATED ──pipeline──▶ SUCCEEDED | CANCELLED | FAILED
//! ```
//!
//! [`ExportController::prepare`] covers `RECEIVED → DELEGATED` (decoding a
//! JSON-encoded `html` field and reading the delivery options), and
//! [`ExportController::run`] waits for the pipeline and turns its outcome into an
//! [`ExportReply`]. The reply decides the response encoding: raw bytes for
//! binary delivery, a JSON envelope otherwise.

use crate::artifacts::ArtifactStore;
use crate::error::{Error, Result};
use crate::pipeline::{ExportFailure, ExportOutcome, ExportPipeline};
use crate::types::{ExportJob, ExportOptions};
use axum::http::StatusCode;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Stage of an export request, used in log records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    /// Body parsed, not yet handed to the pipeline
    Received,
    /// Waiting for the pipeline
    Delegated,
    /// File produced
    Succeeded,
    /// Caller aborted or request superseded
    Cancelled,
    /// Generation failed
    Failed,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportStage::Received => "received",
            ExportStage::Delegated => "delegated",
            ExportStage::Succeeded => "succeeded",
            ExportStage::Cancelled => "cancelled",
            ExportStage::Failed => "failed",
        })
    }
}

/// Terminal result of one export request, ready to be encoded as a response
#[derive(Debug, Clone)]
pub enum ExportReply {
    /// Binary delivery: the produced bytes, sent inline
    Binary(Bytes),
    /// Link delivery: the bytes were parked in the artifact store
    Link {
        /// One-time download URL
        url: String,
    },
    /// The caller went away; nothing meaningful to send
    Cancelled,
    /// Generation failed
    Failed {
        /// Whether the caller asked for binary delivery
        binary: bool,
        /// What went wrong
        failure: ExportFailure,
    },
}

impl ExportReply {
    /// Terminal stage this reply represents
    pub fn stage(&self) -> ExportStage {
        match self {
            ExportReply::Binary(_) | ExportReply::Link { .. } => ExportStage::Succeeded,
            ExportReply::Cancelled => ExportStage::Cancelled,
            ExportReply::Failed { .. } => ExportStage::Failed,
        }
    }

    /// HTTP status for this reply
    ///
    /// Failures are 500 only for binary callers; JSON callers always get 200
    /// and read `success` from the envelope.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExportReply::Binary(_) | ExportReply::Link { .. } => StatusCode::OK,
            ExportReply::Cancelled => StatusCode::NO_CONTENT,
            ExportReply::Failed { binary: true, .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ExportReply::Failed { binary: false, .. } => StatusCode::OK,
        }
    }
}

/// Orchestrates export requests end to end
pub struct ExportController {
    pipeline: Arc<dyn ExportPipeline>,
    store: ArtifactStore,
}

impl ExportController {
    /// Create a controller delegating to `pipeline` and parking links in `store`
    pub fn new(pipeline: Arc<dyn ExportPipeline>, store: ArtifactStore) -> Self {
        Self { pipeline, store }
    }

    /// The store link deliveries are parked in
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Name of the pipeline exports are delegated to
    pub fn pipeline_name(&self) -> &'static str {
        self.pipeline.name()
    }

    /// Normalize a parsed request body into a job for the pipeline.
    ///
    /// A string `html` field is decoded as JSON. Fails with
    /// [`Error::InvalidRequest`] when the body is not an object, `html` is not
    /// valid JSON, or the delivery options cannot be read.
    pub fn prepare(&self, payload: Value, request_id: impl Into<String>) -> Result<ExportJob> {
        let Value::Object(mut fields) = payload else {
            return Err(Error::InvalidRequest(
                "request body must be a JSON object".into(),
            ));
        };

        if let Some(Value::String(encoded)) = fields.get("html") {
            let decoded: Value = serde_json::from_str(encoded)
                .map_err(|e| Error::InvalidRequest(format!("html is not valid JSON: {e}")))?;
            fields.insert("html".into(), decoded);
        }

        let payload = Value::Object(fields);
        let options: ExportOptions = serde_json::from_value(payload.clone())
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        Ok(ExportJob {
            request_id: request_id.into(),
            payload,
            options,
        })
    }

    /// Delegate `job` to the pipeline and classify the outcome.
    ///
    /// `base_url` is the URL the request arrived on; download links are
    /// resolved against it.
    pub async fn run(&self, job: ExportJob, base_url: &Url) -> ExportReply {
        let request_id = job.request_id.as_str();
        let binary = job.options.send_as_binary;

        tracing::debug!(
            request_id,
            stage = %ExportStage::Delegated,
            pipeline = self.pipeline.name(),
            format = %job.options.file_format,
            "Delegating export"
        );

        match self.pipeline.generate(&job).await {
            ExportOutcome::Succeeded(bytes) => {
                tracing::info!(
                    request_id,
                    stage = %ExportStage::Succeeded,
                    size_bytes = bytes.len(),
                    "POST request succeeded"
                );

                if binary {
                    return ExportReply::Binary(bytes);
                }

                let issued = self.store.put(
                    job.options.file_format.clone(),
                    job.options.download_name(),
                    bytes,
                );
                ExportReply::Link {
                    url: artifact_url(base_url, issued.key.as_str()),
                }
            }
            ExportOutcome::Cancelled => {
                tracing::debug!(
                    request_id,
                    stage = %ExportStage::Cancelled,
                    "POST request cancelled"
                );
                ExportReply::Cancelled
            }
            ExportOutcome::Failed(failure) => {
                tracing::warn!(
                    request_id,
                    stage = %ExportStage::Failed,
                    error = %failure.message,
                    "POST request failed"
                );
                tracing::warn!(request_id, trace = %failure.trace, "Export failure trace");
                ExportReply::Failed { binary, failure }
            }
        }
    }
}

/// Resolve the download URL for `key` under the request's own base path
pub fn artifact_url(base_url: &Url, key: &str) -> String {
    let mut base = base_url.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    match base.join(key) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{base}{key}"),
    }
}
