//! # export-courier
//!
//! HTTP front end for export generation.
//!
//! Clients POST an export request; the service hands it to an
//! [`ExportPipeline`](pipeline::ExportPipeline) and delivers the produced file
//! either inline (`sendAsBinary`) or as a one-time download link backed by the
//! in-memory [`ArtifactStore`](artifacts::ArtifactStore).
//!
//! ## Quick Start
//!
//! ```no_run
//! use export_courier::{Config, pipeline, run_until_shutdown, start};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let pipeline = pipeline::from_config(&config.pipeline);
//!
//!     let running = start(config, pipeline).await?;
//!     run_until_shutdown(running).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP routes and router construction
pub mod api;
/// One-time download store
pub mod artifacts;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export request lifecycle
pub mod lifecycle;
/// Export generation backends
pub mod pipeline;
/// Listener bootstrap
pub mod transport;
/// Request and response types
pub mod types;

// Re-export commonly used types
pub use artifacts::{Artifact, ArtifactKey, ArtifactStore};
pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{ExportController, ExportReply, ExportStage};
pub use pipeline::{ExportOutcome, ExportPipeline};
pub use transport::{RunningTransport, Transport};

use std::sync::Arc;

/// Wire the store, controller, router and listeners together and start serving
///
/// Returns once every enabled listener is accepting connections.
pub async fn start(config: Config, pipeline: Arc<dyn ExportPipeline>) -> Result<RunningTransport> {
    config.validate()?;

    let store = ArtifactStore::new(config.artifacts.ttl, config.artifacts.key_length);
    let controller = Arc::new(ExportController::new(pipeline, store));
    let config = Arc::new(config);

    tracing::info!(
        pipeline = controller.pipeline_name(),
        artifact_ttl_ms = config.artifacts.ttl.as_millis() as u64,
        "Starting export server"
    );

    let router = api::create_router(api::AppState::new(controller, config.clone()));
    Transport::new(router, config.server.clone())
        .start_all()
        .await
}

/// Serve until SIGTERM or SIGINT, then shut the listeners down gracefully
///
/// A listener that stops on its own also ends the wait.
pub async fn run_until_shutdown(running: RunningTransport) -> Result<()> {
    let token = running.shutdown_token();
    let wait = running.wait();
    tokio::pin!(wait);

    tokio::select! {
        result = &mut wait => return result,
        () = wait_for_signal() => {}
    }

    tracing::info!("Shutting down listeners");
    token.cancel();
    wait.await
}

/// Resolves on SIGTERM or SIGINT
///
/// A signal whose handler cannot be installed is ignored; if neither can be
/// installed this never resolves and only a listener failure ends the wait.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    async fn received(kind: SignalKind, name: &'static str) -> &'static str {
        match signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(signal = name, error = %e, "Signal handler unavailable");
                std::future::pending::<()>().await;
            }
        }
        name
    }

    let name = tokio::select! {
        name = received(SignalKind::terminate(), "SIGTERM") => name,
        name = received(SignalKind::interrupt(), "SIGINT") => name,
    };
    tracing::info!(signal = name, "Shutdown requested");
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!(signal = "ctrl_c", "Shutdown requested");
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DisabledPipeline;
    use std::time::Duration;

    fn local_config() -> Config {
        let mut config = Config::default();
        config.server.bind_host = std::net::Ipv4Addr::LOCALHOST.into();
        config.server.http_port = 0;
        config.server.https.enabled = false;
        config
    }

    #[tokio::test]
    async fn run_until_shutdown_returns_when_listeners_stop() {
        let running = start(local_config(), Arc::new(DisabledPipeline)).await.unwrap();
        let token = running.shutdown_token();

        let serving = tokio::spawn(run_until_shutdown(running));
        token.cancel();

        tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("listeners should stop without a signal")
            .unwrap()
            .unwrap();
    }
}
