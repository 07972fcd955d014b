//! Vault secret store client.
//!
//! Reads `GET {VAULT_ADDR}/v1{path}` with the caller's token in
//! `X-Vault-Token` and decodes the `env` object from the response `data`.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use catalog_core::error::SecretStoreError;
use catalog_core::secret::{SecretBundle, SecretPath, SecretStore};
use catalog_core::token::AccessToken;

use super::upstream_message;

/// A [`SecretStore`] backed by a Vault server's HTTP API.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    addr: String,
}

#[derive(Deserialize)]
struct SecretResponse {
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

impl VaultClient {
    /// Create a client for the Vault server at `addr`.
    pub fn new(http: reqwest::Client, addr: impl Into<String>) -> Self {
        let addr = addr.into().trim_end_matches('/').to_owned();
        Self { http, addr }
    }

    fn url_for(&self, path: &SecretPath) -> String {
        format!("{}/v1{}", self.addr, path)
    }
}

#[async_trait::async_trait]
impl SecretStore for VaultClient {
    async fn read(
        &self,
        path: &SecretPath,
        token: &AccessToken,
    ) -> Result<SecretBundle, SecretStoreError> {
        debug!(path = %path, token = %token, "reading secret from vault");

        let resp = self
            .http
            .get(self.url_for(path))
            .header("X-Vault-Token", token.expose())
            .send()
            .await
            .map_err(|e| SecretStoreError::Unavailable {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Err(SecretStoreError::NotFound {
                path: path.to_string(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = upstream_message(status, &body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SecretStoreError::Forbidden {
                    path: path.to_string(),
                    reason,
                },
                _ => SecretStoreError::Unavailable { reason },
            });
        }

        let body: SecretResponse =
            resp.json()
                .await
                .map_err(|e| SecretStoreError::InvalidData {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;

        let data = body.data.ok_or_else(|| SecretStoreError::NotFound {
            path: path.to_string(),
        })?;

        SecretBundle::from_secret_data(&data).map_err(|e| SecretStoreError::InvalidData {
            path: path.to_string(),
            reason: format!("env: {e}"),
        })
    }
}
