//! `Catalog` server entry point.
//!
//! Loads configuration, wires the Vault and Marathon clients into the deploy
//! pipeline, and serves the HTTP API until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use catalog_core::pipeline::DeployPipeline;

use catalog_server::clients::{http_client, vault_http_client, MarathonClient, VaultClient};
use catalog_server::config::ServerConfig;
use catalog_server::routes::build_router;
use catalog_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        vault = %config.vault_addr,
        marathon = %config.marathon_url,
        marathon_auth = config.marathon_credentials.is_some(),
        "Catalog starting"
    );

    let state = Arc::new(build_app_state(&config)?);
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Catalog server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Catalog server stopped");
    Ok(())
}

fn build_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let http = http_client(config.request_timeout).context("failed to build HTTP client")?;

    let vault_http = if config.vault_ca_cert.is_some() || config.vault_skip_verify {
        if config.vault_skip_verify {
            warn!("VAULT_SKIP_VERIFY is set; Vault TLS certificates are not verified");
        }
        let ca_cert = config
            .vault_ca_cert
            .as_ref()
            .map(|path| {
                std::fs::read(path)
                    .with_context(|| format!("failed to read VAULT_CACERT {}", path.display()))
            })
            .transpose()?;
        vault_http_client(
            config.request_timeout,
            ca_cert.as_deref(),
            config.vault_skip_verify,
        )
        .context("failed to build Vault HTTP client")?
    } else {
        http.clone()
    };

    let secrets = Arc::new(VaultClient::new(vault_http, config.vault_addr.clone()));
    let orchestrator = Arc::new(MarathonClient::new(
        http,
        config.marathon_url.clone(),
        config.marathon_credentials.clone(),
    ));

    let mut state = AppState::new(DeployPipeline::new(secrets, orchestrator));
    state.max_body_bytes = config.max_body_bytes;
    state.max_concurrent_deploys = config.max_concurrent_deploys;
    Ok(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
