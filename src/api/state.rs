//! Application state for the API server

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::lifecycle::ExportController;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone). Both listeners share one
/// state, so an artifact issued over one can be fetched over the other.
#[derive(Clone)]
pub struct AppState {
    /// Runs export requests through the pipeline
    pub controller: Arc<ExportController>,

    /// Configuration (read-only at runtime)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(controller: Arc<ExportController>, config: Arc<Config>) -> Self {
        Self { controller, config }
    }

    /// Store holding link-delivered artifacts
    pub fn store(&self) -> &ArtifactStore {
        self.controller.store()
    }
}
