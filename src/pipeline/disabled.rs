//! Pipeline used when no generator is configured

use super::traits::{ExportFailure, ExportOutcome, ExportPipeline};
use crate::types::ExportJob;
use async_trait::async_trait;

/// Pipeline that fails every export
///
/// Keeps the server up (liveness, retrieval of nothing) when no generator is
/// configured, and tells export callers why their request cannot succeed.
///
/// # Examples
///
/// ```
/// use export_courier::pipeline::{DisabledPipeline, ExportOutcome, ExportPipeline};
/// use export_courier::types::{ExportJob, ExportOptions};
///
/// # #[tokio::main]
/// # async fn main() {
/// let job = ExportJob {
///     request_id: "abc".into(),
///     payload: serde_json::json!({"fileFormat": "pdf"}),
///     options: ExportOptions::new("pdf"),
/// };
/// let outcome = DisabledPipeline.generate(&job).await;
/// assert!(matches!(outcome, ExportOutcome::Failed(_)));
/// # }
/// ```
pub struct DisabledPipeline;

#[async_trait]
impl ExportPipeline for DisabledPipeline {
    async fn generate(&self, _job: &ExportJob) -> ExportOutcome {
        ExportOutcome::Failed(ExportFailure::with_trace(
            "no export pipeline configured",
            "Set pipeline.command in the configuration file or \
             EXPORT_COURIER_PIPELINE__COMMAND in the environment.",
        ))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
