//! The merge-and-deploy pipeline.
//!
//! One [`DeployPipeline`] is built at startup with its secret store and
//! orchestrator and shared by every request. Per request it moves through:
//!
//! ```text
//! Received → TokenValidated → PayloadDecoded → SecretFetched
//!          → { per job: Submitting → Submitted | Failed } → Completed
//! ```
//!
//! Everything up to `SecretFetched` is whole-request and fail-fast: an error
//! there means no job was submitted. After that, jobs are submitted one at a
//! time in input order and a failed job never stops the ones after it. There
//! are no retries at this layer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::env::merge;
use crate::error::{AggregateError, JobFailure, PipelineError, SubmissionError};
use crate::job::decode_batch;
use crate::orchestrator::{DeploymentId, Orchestrator};
use crate::secret::{SecretPath, SecretStore};
use crate::token::AccessToken;

/// Validates, fetches secrets, merges, and submits job batches.
pub struct DeployPipeline {
    secrets: Arc<dyn SecretStore>,
    orchestrator: Arc<dyn Orchestrator>,
}

impl DeployPipeline {
    /// Create a pipeline over the given collaborators.
    pub fn new(secrets: Arc<dyn SecretStore>, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            secrets,
            orchestrator,
        }
    }

    /// Run one request through the pipeline.
    ///
    /// On success the returned [`DeployReport`] holds one result per job, in
    /// input order. Per-job submission failures are reported there rather
    /// than as an `Err`; use [`DeployReport::aggregate_error`] to collect them.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for whole-request failures: invalid token,
    /// malformed payload, invalid secret name, or a secret store failure.
    /// None of these submit any job.
    pub async fn execute(
        &self,
        raw_payload: &[u8],
        secret_name: &str,
        access_token: &str,
    ) -> Result<DeployReport, PipelineError> {
        let token = AccessToken::parse(access_token)?;
        debug!(token = %token, "access token validated");

        let jobs = decode_batch(raw_payload)?;
        let path = SecretPath::for_name(secret_name)?;
        debug!(jobs = jobs.len(), path = %path, "payload decoded");

        let bundle = self.secrets.read(&path, &token).await?;
        debug!(path = %path, keys = bundle.len(), "secret bundle fetched");

        let mut results = Vec::with_capacity(jobs.len());
        for (index, mut job) in jobs.into_iter().enumerate() {
            let replaced = merge(&mut job.env, bundle.env());
            debug!(index, job_id = %job.id, replaced, "submitting job");

            let result = self.orchestrator.submit(&job).await;
            match &result {
                Ok(deployment_id) => info!(
                    index,
                    job_id = %job.id,
                    deployment_id = %deployment_id,
                    path = %path,
                    "job deployed with injected secrets"
                ),
                Err(e) => warn!(
                    index,
                    job_id = %job.id,
                    error = %e,
                    "job submission failed"
                ),
            }

            results.push(JobOutcome {
                index,
                job_id: job.id,
                result,
            });
        }

        let report = DeployReport { results };
        info!(
            path = %path,
            jobs = report.len(),
            status = ?report.status(),
            "batch completed"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for DeployPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployPipeline").finish_non_exhaustive()
    }
}

/// Result of submitting one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Position of the job in the submitted batch.
    pub index: usize,
    /// The job's application id.
    pub job_id: String,
    /// Deployment id on success, the submission error otherwise.
    pub result: Result<DeploymentId, SubmissionError>,
}

/// Overall outcome of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every job was deployed.
    Deployed,
    /// Some jobs were deployed and some failed.
    PartiallyFailed,
    /// No job was deployed.
    Failed,
}

/// Ordered per-job results of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    results: Vec<JobOutcome>,
}

impl DeployReport {
    /// One outcome per submitted job, in input order.
    pub fn results(&self) -> &[JobOutcome] {
        &self.results
    }

    /// Number of jobs attempted.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Deployment ids of the jobs that succeeded, in input order.
    pub fn deployment_ids(&self) -> Vec<DeploymentId> {
        self.results
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().cloned())
            .collect()
    }

    /// The failed jobs, in input order.
    pub fn failures(&self) -> Vec<JobFailure> {
        self.results
            .iter()
            .filter_map(|outcome| {
                outcome.result.as_ref().err().map(|error| JobFailure {
                    index: outcome.index,
                    job_id: outcome.job_id.clone(),
                    error: error.clone(),
                })
            })
            .collect()
    }

    /// Classify the batch.
    pub fn status(&self) -> BatchStatus {
        let failed = self.results.iter().filter(|o| o.result.is_err()).count();
        if failed == 0 {
            BatchStatus::Deployed
        } else if failed == self.results.len() {
            BatchStatus::Failed
        } else {
            BatchStatus::PartiallyFailed
        }
    }

    /// Every submission failure combined into one error, or `None` if all
    /// jobs were deployed.
    pub fn aggregate_error(&self) -> Option<AggregateError> {
        let failures = self.failures();
        if failures.is_empty() {
            None
        } else {
            Some(AggregateError {
                attempted: self.results.len(),
                failures,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::env::EnvironmentMap;
    use crate::error::{PayloadError, SecretStoreError};
    use crate::memory::{MemoryOrchestrator, MemorySecretStore};
    use crate::secret::SecretBundle;

    const TOKEN: &str = "abcdef01-1234-4abc-9def-0123456789ab";

    fn pipeline(
        store: &MemorySecretStore,
        orchestrator: &MemoryOrchestrator,
    ) -> DeployPipeline {
        DeployPipeline::new(Arc::new(store.clone()), Arc::new(orchestrator.clone()))
    }

    async fn store_with_db_pass() -> MemorySecretStore {
        let store = MemorySecretStore::new();
        store
            .insert("/secret/web", SecretBundle::from_iter([("DB_PASS", "s3cr3t")]))
            .await;
        store
    }

    fn env(pairs: &[(&str, &str)]) -> EnvironmentMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn secret_overrides_placeholder_before_submit() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();
        let body = br#"{"id": "/web", "env": {"DB_PASS": "placeholder", "PORT": "8080"}}"#;

        let report = pipeline(&store, &orchestrator)
            .execute(body, "web", TOKEN)
            .await
            .unwrap();

        assert_eq!(report.status(), BatchStatus::Deployed);
        let submitted = orchestrator.submissions().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(
            submitted[0].env,
            env(&[("DB_PASS", "s3cr3t"), ("PORT", "8080")])
        );
    }

    #[tokio::test]
    async fn all_jobs_succeed_in_input_order() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();
        let body = br#"[{"id": "/a"}, {"id": "/b"}, {"id": "/c"}]"#;

        let report = pipeline(&store, &orchestrator)
            .execute(body, "web", TOKEN)
            .await
            .unwrap();

        let ids: Vec<String> = report
            .deployment_ids()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, ["deployment-1", "deployment-2", "deployment-3"]);
        assert!(report.aggregate_error().is_none());

        let order: Vec<String> = orchestrator
            .submissions()
            .await
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(order, ["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn failed_job_does_not_stop_the_batch() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();
        orchestrator
            .fail_job(
                "/b",
                SubmissionError::Rejected {
                    status: 422,
                    message: "Object is not valid".to_owned(),
                },
            )
            .await;
        let body = br#"[{"id": "/a"}, {"id": "/b"}, {"id": "/c"}]"#;

        let report = pipeline(&store, &orchestrator)
            .execute(body, "web", TOKEN)
            .await
            .unwrap();

        assert_eq!(report.status(), BatchStatus::PartiallyFailed);
        assert_eq!(report.len(), 3);
        assert_eq!(report.deployment_ids().len(), 2);

        let aggregate = report.aggregate_error().unwrap();
        assert_eq!(aggregate.attempted, 3);
        assert_eq!(aggregate.failures.len(), 1);
        assert_eq!(aggregate.failures[0].index, 1);
        assert_eq!(aggregate.failures[0].job_id, "/b");

        let order: Vec<String> = orchestrator
            .submissions()
            .await
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(order, ["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn every_job_failing_is_total_failure() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();
        for id in ["/a", "/b"] {
            orchestrator
                .fail_job(
                    id,
                    SubmissionError::Transport {
                        reason: "connection refused".to_owned(),
                    },
                )
                .await;
        }

        let report = pipeline(&store, &orchestrator)
            .execute(br#"[{"id": "/a"}, {"id": "/b"}]"#, "web", TOKEN)
            .await
            .unwrap();

        assert_eq!(report.status(), BatchStatus::Failed);
        assert!(report.deployment_ids().is_empty());
        assert!(report.aggregate_error().unwrap().is_total());
    }

    #[tokio::test]
    async fn invalid_token_makes_no_calls() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();

        let err = pipeline(&store, &orchestrator)
            .execute(br#"{"id": "/web"}"#, "web", "not-a-token")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidToken(_)));
        assert_eq!(store.read_count(), 0);
        assert_eq!(orchestrator.submit_count(), 0);
    }

    #[tokio::test]
    async fn invalid_token_wins_over_malformed_payload() {
        let store = MemorySecretStore::new();
        let orchestrator = MemoryOrchestrator::new();

        let err = pipeline(&store, &orchestrator)
            .execute(b"not json", "web", "")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn malformed_payload_skips_secret_store() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();

        let err = pipeline(&store, &orchestrator)
            .execute(br#""just a string""#, "web", TOKEN)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::MalformedPayload(PayloadError::UnexpectedShape { found: "a string" })
        );
        assert_eq!(store.read_count(), 0);
        assert_eq!(orchestrator.submit_count(), 0);
    }

    #[tokio::test]
    async fn missing_secret_submits_nothing() {
        let store = MemorySecretStore::new();
        let orchestrator = MemoryOrchestrator::new();

        let err = pipeline(&store, &orchestrator)
            .execute(br#"[{"id": "/a"}, {"id": "/b"}]"#, "missing", TOKEN)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::SecretNotFound {
                path: "/secret/missing".to_owned()
            }
        );
        assert_eq!(store.read_count(), 1);
        assert_eq!(orchestrator.submit_count(), 0);
    }

    #[tokio::test]
    async fn forbidden_secret_submits_nothing() {
        let store = store_with_db_pass().await;
        store.deny_token(TOKEN).await;
        let orchestrator = MemoryOrchestrator::new();

        let err = pipeline(&store, &orchestrator)
            .execute(br#"{"id": "/web"}"#, "web", TOKEN)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::SecretStore(SecretStoreError::Forbidden { .. })
        ));
        assert_eq!(orchestrator.submit_count(), 0);
    }

    #[tokio::test]
    async fn invalid_secret_name_skips_secret_store() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();

        let err = pipeline(&store, &orchestrator)
            .execute(br#"{"id": "/web"}"#, "../sys", TOKEN)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidSecretName(_)));
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn each_job_gets_the_same_overlay() {
        let store = store_with_db_pass().await;
        let orchestrator = MemoryOrchestrator::new();
        let body = br#"[
            {"id": "/a", "env": {"DB_PASS": "one"}},
            {"id": "/b", "env": {"OTHER": "x"}}
        ]"#;

        pipeline(&store, &orchestrator)
            .execute(body, "web", TOKEN)
            .await
            .unwrap();

        let submitted = orchestrator.submissions().await;
        assert_eq!(submitted[0].env, env(&[("DB_PASS", "s3cr3t")]));
        assert_eq!(
            submitted[1].env,
            env(&[("DB_PASS", "s3cr3t"), ("OTHER", "x")])
        );
    }
}
