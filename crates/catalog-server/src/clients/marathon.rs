//! Marathon orchestrator client.
//!
//! Each job is sent as `PUT {MARATHON_URL}/v2/apps/{id}?force=false`, which
//! creates the app or replaces its definition. Marathon answers with the id
//! of the deployment it started.

use serde::Deserialize;
use tracing::debug;

use catalog_core::error::SubmissionError;
use catalog_core::job::JobSpec;
use catalog_core::orchestrator::{DeploymentId, Orchestrator};

use super::upstream_message;
use crate::config::MarathonCredentials;

/// An [`Orchestrator`] backed by the Marathon REST API.
#[derive(Debug, Clone)]
pub struct MarathonClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<MarathonCredentials>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentResponse {
    deployment_id: String,
}

impl MarathonClient {
    /// Create a client for the Marathon API at `base_url`.
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Option<MarathonCredentials>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            base_url,
            credentials,
        }
    }

    fn app_url(&self, id: &str) -> Result<String, SubmissionError> {
        Ok(format!(
            "{}/v2/apps/{}?force=false",
            self.base_url,
            app_path(id)?
        ))
    }
}

/// Percent-encode each segment of a Marathon app id (`/group/app`).
///
/// Leading and trailing slashes are ignored; an empty id or an empty segment
/// in the middle is rejected before any request is made.
fn app_path(id: &str) -> Result<String, SubmissionError> {
    let invalid = || SubmissionError::InvalidJobId { id: id.to_owned() };

    let trimmed = id.trim_matches('/');
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        segments.push(urlencoding::encode(segment).into_owned());
    }
    Ok(segments.join("/"))
}

#[async_trait::async_trait]
impl Orchestrator for MarathonClient {
    async fn submit(&self, job: &JobSpec) -> Result<DeploymentId, SubmissionError> {
        let url = self.app_url(&job.id)?;
        debug!(id = %job.id, env_keys = job.env.len(), "submitting job to marathon");

        let mut request = self.http.put(url).json(job);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SubmissionError::Transport {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                message: upstream_message(status, &body),
            });
        }

        let body: DeploymentResponse =
            resp.json()
                .await
                .map_err(|e| SubmissionError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        Ok(DeploymentId::from(body.deployment_id))
    }
}
