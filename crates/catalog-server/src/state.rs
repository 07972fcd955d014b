//! Shared application state for `Catalog` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the deploy pipeline, which in turn owns
//! the long-lived secret store and orchestrator clients.

use catalog_core::pipeline::DeployPipeline;

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default number of deploy requests processed at once.
pub const DEFAULT_MAX_CONCURRENT_DEPLOYS: usize = 64;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// The merge-and-deploy pipeline.
    pub pipeline: DeployPipeline,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// Maximum number of deploy requests in flight.
    pub max_concurrent_deploys: usize,
}

impl AppState {
    /// State with default request limits.
    pub fn new(pipeline: DeployPipeline) -> Self {
        Self {
            pipeline,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_concurrent_deploys: DEFAULT_MAX_CONCURRENT_DEPLOYS,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("max_body_bytes", &self.max_body_bytes)
            .field("max_concurrent_deploys", &self.max_concurrent_deploys)
            .finish_non_exhaustive()
    }
}
