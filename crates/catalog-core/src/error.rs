//! Error types for `catalog-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Errors never include token material or secret values, only
//! paths, job identifiers, and upstream status descriptions.

/// The access token does not have the required 8-4-4-4-12 hexadecimal shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid access token: expected five hyphen-separated hex groups of 8-4-4-4-12 characters")]
pub struct InvalidTokenError;

/// Errors from decoding the request payload into a job batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The payload is not syntactically valid JSON.
    #[error("payload is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    /// The payload is valid JSON but neither a job object nor an array.
    #[error("expected a job object or an array of job objects, found {found}")]
    UnexpectedShape { found: &'static str },

    /// A job in the batch is missing required fields or has the wrong types.
    #[error("job at index {index} is invalid: {reason}")]
    InvalidJob { index: usize, reason: String },

    /// The payload is an empty array.
    #[error("job batch is empty")]
    EmptyBatch,
}

/// The request-supplied secret name cannot be turned into a secret path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid secret name '{name}': {reason}")]
pub struct SecretNameError {
    pub name: String,
    pub reason: &'static str,
}

/// Errors from decoding a JSON object into an environment map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvDecodeError {
    /// The value is not a JSON object.
    #[error("expected an object, found {found}")]
    NotAnObject { found: &'static str },

    /// A variable's value is not a string, number, or boolean.
    #[error("value for '{key}' must be a string, found {found}")]
    InvalidValue { key: String, found: &'static str },
}

/// Errors from the secret store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretStoreError {
    /// No secret exists at the requested path.
    #[error("no secret found at '{path}'")]
    NotFound { path: String },

    /// The store rejected the token for this path.
    #[error("secret store denied access to '{path}': {reason}")]
    Forbidden { path: String, reason: String },

    /// The store could not be reached or answered with an unexpected status.
    #[error("secret store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The secret exists but its data cannot be decoded into an environment.
    #[error("secret data at '{path}' is not a valid environment bundle: {reason}")]
    InvalidData { path: String, reason: String },
}

/// Errors from submitting a single job to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// The job id cannot be used as an orchestrator application id.
    #[error("job id '{id}' is not a valid application id")]
    InvalidJobId { id: String },

    /// The orchestrator answered with a non-success status.
    #[error("orchestrator rejected the job with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never completed (connect, timeout, TLS).
    #[error("orchestrator transport error: {reason}")]
    Transport { reason: String },

    /// The orchestrator accepted the job but the response was unreadable.
    #[error("orchestrator returned an unreadable response: {reason}")]
    InvalidResponse { reason: String },
}

/// Whole-request errors from the deploy pipeline.
///
/// Every variant is raised before any job is submitted, so none of them leave
/// partial side effects at the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The access token failed shape validation.
    #[error(transparent)]
    InvalidToken(#[from] InvalidTokenError),

    /// The payload does not decode into a job batch.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    /// The secret name does not produce a valid secret path.
    #[error(transparent)]
    InvalidSecretName(#[from] SecretNameError),

    /// The secret store holds nothing at the derived path.
    #[error("secret not found at '{path}'")]
    SecretNotFound { path: String },

    /// The secret store failed for a reason other than not-found.
    #[error("secret store error: {0}")]
    SecretStore(SecretStoreError),
}

impl From<SecretStoreError> for PipelineError {
    fn from(err: SecretStoreError) -> Self {
        match err {
            SecretStoreError::NotFound { path } => Self::SecretNotFound { path },
            other => Self::SecretStore(other),
        }
    }
}

/// One failed job within a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job {index} ('{job_id}'): {error}")]
pub struct JobFailure {
    /// Position of the job in the submitted batch.
    pub index: usize,
    /// The job's application id.
    pub job_id: String,
    /// Why the submission failed.
    pub error: SubmissionError,
}

/// Every per-job failure from one batch, in input order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.attempted, .failures))]
pub struct AggregateError {
    /// Number of jobs the pipeline attempted.
    pub attempted: usize,
    /// The failed jobs.
    pub failures: Vec<JobFailure>,
}

impl AggregateError {
    /// True when no job in the batch was deployed.
    pub fn is_total(&self) -> bool {
        self.failures.len() == self.attempted
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn summarize(attempted: &usize, failures: &[JobFailure]) -> String {
    let details: Vec<String> = failures.iter().map(ToString::to_string).collect();
    if details.is_empty() {
        format!("0 of {attempted} jobs failed to deploy")
    } else {
        format!(
            "{} of {attempted} jobs failed to deploy: {}",
            failures.len(),
            details.join("; ")
        )
    }
}
