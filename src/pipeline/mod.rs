//! External export generation
//!
//! Producing the actual document is not this crate's job. The
//! [`ExportPipeline`] trait is the seam where a generator plugs in, and every
//! generation attempt ends in exactly one [`ExportOutcome`]:
//!
//! - [`ExportOutcome::Succeeded`] with the produced bytes
//! - [`ExportOutcome::Cancelled`] when the caller aborted or a newer request
//!   superseded this one
//! - [`ExportOutcome::Failed`] with a message and a trace for anything else
//!
//! Two implementations ship with the crate:
//!
//! - [`CommandPipeline`]: runs an external command per request
//! - [`DisabledPipeline`]: fails every request, used when nothing is configured
//!
//! ## Usage
//!
//! ```no_run
//! use export_courier::pipeline::{CommandPipeline, ExportPipeline};
//!
//! # fn example() {
//! let pipeline = CommandPipeline::from_path("render-export", vec!["--stdin".into()])
//!     .expect("render-export not found in PATH");
//! println!("using {}", pipeline.name());
//! # }
//! ```

mod command;
mod disabled;
mod traits;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use command::CommandPipeline;
pub use disabled::DisabledPipeline;
pub use traits::{ExportFailure, ExportOutcome, ExportPipeline};

use crate::config::PipelineConfig;
use std::sync::Arc;

/// Build the pipeline described by the configuration.
///
/// Falls back to [`DisabledPipeline`] when no command is configured or the
/// command cannot be found.
pub fn from_config(config: &PipelineConfig) -> Arc<dyn ExportPipeline> {
    let Some(command) = &config.command else {
        tracing::warn!("No export pipeline configured, every export will fail");
        return Arc::new(DisabledPipeline);
    };

    let resolved = if command.components().count() > 1 {
        Some(CommandPipeline::new(command.clone(), config.args.clone()))
    } else {
        CommandPipeline::from_path(command, config.args.clone())
    };

    match resolved {
        Some(pipeline) => {
            tracing::info!(command = %command.display(), "Using command export pipeline");
            Arc::new(pipeline)
        }
        None => {
            tracing::warn!(
                command = %command.display(),
                "Export command not found in PATH, every export will fail"
            );
            Arc::new(DisabledPipeline)
        }
    }
}
