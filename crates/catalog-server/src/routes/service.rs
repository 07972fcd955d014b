//! Deploy route: `POST /service/{name}`
//!
//! Reads the `X-Vault-Token` header and the raw job payload, runs them through
//! the deploy pipeline with secret `/secret/{name}`, and reports one
//! deployment id per job.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use catalog_core::orchestrator::DeploymentId;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the caller's Vault token.
pub const VAULT_TOKEN_HEADER: &str = "x-vault-token";

/// Build the `/service` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/{name}", post(deploy_service))
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    /// One id per job, in input order.
    pub deployment_ids: Vec<DeploymentId>,
}

/// Inject secrets into the posted job(s) and deploy them.
///
/// The body is taken as raw bytes so that decoding failures surface as the
/// pipeline's 422 rather than the extractor's own rejection. Extractor
/// rejections are turned into JSON errors too. A missing token header is
/// treated like a malformed one.
async fn deploy_service(
    State(state): State<Arc<AppState>>,
    name: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<DeployResponse>, AppError> {
    let Path(name) = name.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let body = body.map_err(body_rejection)?;

    let token = headers
        .get(VAULT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let report = state.pipeline.execute(&body, &name, token).await?;

    let deployment_ids = report.deployment_ids();
    if let Some(error) = report.aggregate_error() {
        return Err(AppError::DeployFailed {
            error,
            deployment_ids,
        });
    }

    Ok(Json(DeployResponse { deployment_ids }))
}

fn body_rejection(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(rejection.body_text())
    } else {
        AppError::BadRequest(rejection.body_text())
    }
}
