//! Scripted pipeline for controller and router tests.

use super::{ExportOutcome, ExportPipeline};
use crate::types::ExportJob;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Pipeline that answers every job with a fixed outcome and records what it saw.
pub(crate) struct ScriptedPipeline {
    outcome: ExportOutcome,
    delay: Option<Duration>,
    jobs: Mutex<Vec<ExportJob>>,
}

impl ScriptedPipeline {
    pub(crate) fn new(outcome: ExportOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn succeeding(bytes: &'static [u8]) -> Self {
        Self::new(ExportOutcome::Succeeded(bytes.into()))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn jobs(&self) -> Vec<ExportJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExportPipeline for ScriptedPipeline {
    async fn generate(&self, job: &ExportJob) -> ExportOutcome {
        self.jobs.lock().unwrap().push(job.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
