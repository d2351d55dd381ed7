//! Pipelines with predictable behavior

use async_trait::async_trait;
use export_courier::pipeline::{ExportFailure, ExportOutcome, ExportPipeline};
use export_courier::types::ExportJob;
use std::sync::Arc;
use std::time::Duration;

/// Always answers with the same outcome, optionally after a delay
pub struct FixedPipeline {
    outcome: ExportOutcome,
    delay: Duration,
}

impl FixedPipeline {
    /// Succeeds with `bytes`
    pub fn producing(bytes: &'static [u8]) -> Arc<dyn ExportPipeline> {
        Arc::new(Self {
            outcome: ExportOutcome::Succeeded(bytes.into()),
            delay: Duration::ZERO,
        })
    }

    /// Fails with `message` and `trace`
    pub fn failing(message: &str, trace: &str) -> Arc<dyn ExportPipeline> {
        Arc::new(Self {
            outcome: ExportOutcome::Failed(ExportFailure::with_trace(message, trace)),
            delay: Duration::ZERO,
        })
    }

    /// Succeeds, but only after `delay`
    pub fn slow(delay: Duration) -> Arc<dyn ExportPipeline> {
        Arc::new(Self {
            outcome: ExportOutcome::Succeeded("too late".into()),
            delay,
        })
    }
}

#[async_trait]
impl ExportPipeline for FixedPipeline {
    async fn generate(&self, _job: &ExportJob) -> ExportOutcome {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Echoes the format and request id back as the produced file
pub struct EchoPipeline;

#[async_trait]
impl ExportPipeline for EchoPipeline {
    async fn generate(&self, job: &ExportJob) -> ExportOutcome {
        let body = format!("{}:{}", job.options.file_format, job.request_id);
        ExportOutcome::Succeeded(body.into())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}
