//! In-memory collaborators for testing.
//!
//! [`MemorySecretStore`] and [`MemoryOrchestrator`] implement the pipeline's
//! capability traits without any network. Both count their calls so tests can
//! assert that a rejected request never reached a collaborator. Clones share
//! state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{SecretStoreError, SubmissionError};
use crate::job::JobSpec;
use crate::orchestrator::{DeploymentId, Orchestrator};
use crate::secret::{SecretBundle, SecretPath, SecretStore};
use crate::token::AccessToken;

/// A secret store backed by a `HashMap` of path → bundle.
///
/// # Examples
///
/// ```
/// # use catalog_core::memory::MemorySecretStore;
/// # use catalog_core::secret::{SecretBundle, SecretPath, SecretStore};
/// # use catalog_core::token::AccessToken;
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemorySecretStore::new();
/// store.insert("/secret/web", SecretBundle::from_iter([("DB_PASS", "s3cr3t")])).await;
///
/// let token = AccessToken::parse("abcdef01-1234-4abc-9def-0123456789ab").unwrap();
/// let path = SecretPath::for_name("web").unwrap();
/// let bundle = store.read(&path, &token).await.unwrap();
/// assert_eq!(bundle.len(), 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    bundles: Arc<RwLock<HashMap<String, SecretBundle>>>,
    denied_tokens: Arc<RwLock<HashSet<String>>>,
    reads: Arc<AtomicUsize>,
}

impl MemorySecretStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bundle` at `path` (e.g. `/secret/web`).
    pub async fn insert(&self, path: &str, bundle: SecretBundle) {
        self.bundles.write().await.insert(path.to_owned(), bundle);
    }

    /// Make every read with `token` fail as forbidden.
    pub async fn deny_token(&self, token: &str) {
        self.denied_tokens.write().await.insert(token.to_owned());
    }

    /// Number of `read` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SecretStore for MemorySecretStore {
    async fn read(
        &self,
        path: &SecretPath,
        token: &AccessToken,
    ) -> Result<SecretBundle, SecretStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.denied_tokens.read().await.contains(token.expose()) {
            return Err(SecretStoreError::Forbidden {
                path: path.to_string(),
                reason: "permission denied".to_owned(),
            });
        }

        self.bundles
            .read()
            .await
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound {
                path: path.to_string(),
            })
    }
}

/// An orchestrator that records every submitted job.
///
/// Successful submissions get sequential ids `deployment-1`, `deployment-2`,
/// and so on. Jobs registered with [`fail_job`](Self::fail_job) fail with the
/// given error but are still recorded.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrchestrator {
    submitted: Arc<RwLock<Vec<JobSpec>>>,
    failures: Arc<RwLock<HashMap<String, SubmissionError>>>,
    submits: Arc<AtomicUsize>,
    deployed: Arc<AtomicUsize>,
}

impl MemoryOrchestrator {
    /// Create an orchestrator that accepts every job.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make submissions of the job with `id` fail with `error`.
    pub async fn fail_job(&self, id: &str, error: SubmissionError) {
        self.failures.write().await.insert(id.to_owned(), error);
    }

    /// Every job submitted so far, in submission order, as received.
    pub async fn submissions(&self) -> Vec<JobSpec> {
        self.submitted.read().await.clone()
    }

    /// Number of `submit` calls so far.
    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Orchestrator for MemoryOrchestrator {
    async fn submit(&self, job: &JobSpec) -> Result<DeploymentId, SubmissionError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submitted.write().await.push(job.clone());

        if let Some(error) = self.failures.read().await.get(&job.id) {
            return Err(error.clone());
        }

        let n = self.deployed.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        Ok(DeploymentId::new(format!("deployment-{n}")))
    }
}
