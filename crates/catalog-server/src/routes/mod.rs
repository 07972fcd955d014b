//! HTTP routes for `Catalog`.
//!
//! - `POST /service/{name}`: inject `/secret/{name}` and deploy
//! - `GET /` and `GET /health`: liveness
//!
//! Anything else gets a JSON 404, and a known route hit with the wrong
//! method gets a JSON 405.

pub mod health;
pub mod service;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, Uri};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Bound in-flight deploys; each one holds upstream connections open.
    let deploy_routes = Router::new()
        .nest("/service", service::router())
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(ConcurrencyLimitLayer::new(state.max_concurrent_deploys));

    Router::new()
        .merge(health::router())
        .merge(deploy_routes)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!("{method} is not allowed on '{}'", uri.path()))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::RouteNotFound(format!("no route for '{}'", uri.path()))
}
