//! Export generation through an external command

use super::traits::{ExportFailure, ExportOutcome, ExportPipeline};
use crate::types::ExportJob;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs one external process per export
///
/// The normalized request (with `requestId` added) is written to the
/// process's stdin as JSON. The outcome follows the exit status:
///
/// - exit code 0: stdout is the produced file
/// - non-zero exit code: failure, stderr becomes the trace
/// - terminated by a signal: cancelled
///
/// The request id is also exported as `EXPORT_REQUEST_ID`.
pub struct CommandPipeline {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandPipeline {
    /// Create a pipeline for an explicit program path
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// Resolve `name` through `PATH`
    ///
    /// Returns `None` if no such executable exists.
    pub fn from_path(name: impl AsRef<OsStr>, args: Vec<String>) -> Option<Self> {
        which::which(name).ok().map(|program| Self::new(program, args))
    }

    fn stdin_payload(job: &ExportJob) -> Vec<u8> {
        let mut payload = job.payload.clone();
        if let Some(fields) = payload.as_object_mut() {
            fields.insert(
                "requestId".into(),
                serde_json::Value::String(job.request_id.clone()),
            );
        }
        payload.to_string().into_bytes()
    }
}

#[async_trait]
impl ExportPipeline for CommandPipeline {
    async fn generate(&self, job: &ExportJob) -> ExportOutcome {
        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .env("EXPORT_REQUEST_ID", &job.request_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return ExportOutcome::Failed(ExportFailure::with_trace(
                    format!("failed to start export command: {e}"),
                    format!("{}: {e}", self.program.display()),
                ));
            }
        };

        // Feed stdin concurrently so a chatty child cannot deadlock on a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = Self::stdin_payload(job);
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!(error = %e, "Export command closed stdin early");
                }
            })
        });

        let output = match child.wait_with_output().await {
            Ok(output) => output,
            Err(e) => return ExportOutcome::Failed(ExportFailure::from_error(&e)),
        };

        if let Some(writer) = writer {
            let _ = writer.await;
        }

        match output.status.code() {
            Some(0) => ExportOutcome::Succeeded(output.stdout.into()),
            Some(code) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let message = stderr
                    .lines()
                    .next()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("export command exited with status {code}"));
                ExportOutcome::Failed(ExportFailure::with_trace(message, stderr))
            }
            None => ExportOutcome::Cancelled,
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
