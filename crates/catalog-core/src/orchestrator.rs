//! The [`Orchestrator`] capability and deployment identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;
use crate::job::JobSpec;

/// Opaque identifier of a deployment started by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeploymentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Submits jobs to a cluster orchestrator.
///
/// One call per job. Implementations must be `Send + Sync` so a single client
/// can serve concurrent requests, and must not retry on their own.
#[async_trait::async_trait]
pub trait Orchestrator: Send + Sync + 'static {
    /// Submit `job` for deployment.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError`] if the job cannot be submitted or the
    /// orchestrator rejects it.
    async fn submit(&self, job: &JobSpec) -> Result<DeploymentId, SubmissionError>;
}
