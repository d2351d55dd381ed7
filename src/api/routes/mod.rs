//! Route handlers for the HTTP API
//!
//! Handlers are organized by concern:
//! - [`export`] - Export submission
//! - [`artifacts`] - One-time artifact download
//! - [`system`] - Liveness, OpenAPI

mod artifacts;
mod export;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use artifacts::*;
pub use export::*;
pub use system::*;
