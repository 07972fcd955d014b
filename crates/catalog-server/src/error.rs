//! HTTP error types for `Catalog` server.
//!
//! Maps pipeline errors from `catalog-core` into HTTP responses. Every error
//! produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`; a failed batch additionally reports the
//! deployments that did succeed and each individual failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use catalog_core::error::{AggregateError, PipelineError, SecretStoreError};
use catalog_core::orchestrator::DeploymentId;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Access token missing or malformed.
    InvalidToken(String),
    /// The secret store rejected the token.
    SecretForbidden(String),
    /// The secret store failed for another reason.
    SecretStore(String),
    /// No secret at the requested path.
    SecretNotFound(String),
    /// Client sent an unusable secret name.
    BadRequest(String),
    /// The job payload could not be decoded.
    Unprocessable(String),
    /// One or more jobs failed to deploy.
    DeployFailed {
        error: AggregateError,
        deployment_ids: Vec<DeploymentId>,
    },
    /// Request body exceeded the configured limit.
    PayloadTooLarge(String),
    /// The route exists but not for this method.
    MethodNotAllowed(String),
    /// No route matched.
    RouteNotFound(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// JSON body for a partially or totally failed batch.
#[derive(Serialize)]
struct DeployFailedBody {
    error: &'static str,
    message: String,
    deployment_ids: Vec<DeploymentId>,
    failures: Vec<FailureBody>,
}

#[derive(Serialize)]
struct FailureBody {
    index: usize,
    id: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::InvalidToken(msg) => (StatusCode::FORBIDDEN, "invalid_token", msg),
            Self::SecretForbidden(msg) => (StatusCode::FORBIDDEN, "secret_store_forbidden", msg),
            Self::SecretStore(msg) => (StatusCode::FORBIDDEN, "secret_store_error", msg),
            Self::SecretNotFound(msg) => (StatusCode::NOT_FOUND, "secret_not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", msg)
            }
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg),
            Self::MethodNotAllowed(msg) => {
                (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", msg)
            }
            Self::RouteNotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::DeployFailed {
                error,
                deployment_ids,
            } => {
                let body = DeployFailedBody {
                    error: "deployment_failed",
                    message: error.to_string(),
                    deployment_ids,
                    failures: error
                        .failures
                        .into_iter()
                        .map(|f| FailureBody {
                            index: f.index,
                            id: f.job_id,
                            message: f.error.to_string(),
                        })
                        .collect(),
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidToken(_) => Self::InvalidToken(err.to_string()),
            PipelineError::MalformedPayload(_) => Self::Unprocessable(err.to_string()),
            PipelineError::InvalidSecretName(_) => Self::BadRequest(err.to_string()),
            PipelineError::SecretNotFound { .. } => Self::SecretNotFound(err.to_string()),
            PipelineError::SecretStore(ref inner) => match inner {
                SecretStoreError::Forbidden { .. } => Self::SecretForbidden(err.to_string()),
                SecretStoreError::NotFound { .. } => Self::SecretNotFound(err.to_string()),
                SecretStoreError::Unavailable { .. } | SecretStoreError::InvalidData { .. } => {
                    Self::SecretStore(err.to_string())
                }
            },
        }
    }
}
