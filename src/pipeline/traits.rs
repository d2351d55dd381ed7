//! Traits and types for export generation

use crate::types::ExportJob;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Terminal result of one generation attempt
#[must_use]
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// The file was produced
    Succeeded(Bytes),
    /// The caller aborted or a superseding request preempted this one
    Cancelled,
    /// Generation failed for any other reason
    Failed(ExportFailure),
}

impl ExportOutcome {
    /// Shorthand for a failure without a separate trace
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(ExportFailure::new(message))
    }
}

/// Why generation failed, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    /// Short human-readable message
    pub message: String,
    /// Longer diagnostic trace (stderr, error chain, ...)
    pub trace: String,
}

impl ExportFailure {
    /// Failure whose trace is just the message
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            trace: message.clone(),
            message,
        }
    }

    /// Failure with an explicit trace
    pub fn with_trace(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Build a failure from an error, rendering its source chain as the trace
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push_str("\n    caused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            trace,
        }
    }
}

impl fmt::Display for ExportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Trait for export generators
///
/// The controller hands every normalized request to `generate` together with
/// its correlation id and waits for the outcome. Implementations never raise
/// cancellation as an error; they report it as [`ExportOutcome::Cancelled`].
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use export_courier::pipeline::{ExportOutcome, ExportPipeline};
/// use export_courier::types::ExportJob;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ExportPipeline for Echo {
///     async fn generate(&self, job: &ExportJob) -> ExportOutcome {
///         ExportOutcome::Succeeded(job.payload.to_string().into())
///     }
///
///     fn name(&self) -> &'static str {
///         "echo"
///     }
/// }
/// ```
#[async_trait]
pub trait ExportPipeline: Send + Sync {
    /// Produce the file described by `job`
    async fn generate(&self, job: &ExportJob) -> ExportOutcome;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
