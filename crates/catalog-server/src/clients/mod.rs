//! HTTP clients for the upstream services: Vault for secrets and Marathon
//! for deployments.

pub mod marathon;
pub mod vault;

use std::time::Duration;

pub use marathon::MarathonClient;
pub use vault::VaultClient;

/// Build the shared `reqwest` client used by both upstream clients.
///
/// # Errors
///
/// Returns the underlying `reqwest` error if the TLS backend fails to
/// initialise.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    builder(timeout).build()
}

/// Build a client for Vault with its own TLS trust settings.
///
/// `ca_cert_pem` adds a PEM-encoded root certificate on top of the built-in
/// roots. `skip_verify` disables certificate verification entirely.
///
/// # Errors
///
/// Returns the underlying `reqwest` error if the certificate cannot be
/// parsed or the TLS backend fails to initialise.
pub fn vault_http_client(
    timeout: Duration,
    ca_cert_pem: Option<&[u8]>,
    skip_verify: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = builder(timeout);
    if let Some(pem) = ca_cert_pem {
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
    }
    if skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build()
}

fn builder(timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("catalog/", env!("CARGO_PKG_VERSION")))
}

/// Pull a human-readable message out of an upstream error body.
///
/// Vault reports `{"errors": ["..."]}`; Marathon reports `{"message": "..."}`.
/// Falls back to the status line when the body says nothing useful.
pub(crate) fn upstream_message(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .or_else(|| {
                let errors: Vec<&str> = v
                    .get("errors")?
                    .as_array()?
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .collect();
                (!errors.is_empty()).then(|| errors.join("; "))
            })
    });

    from_json
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
