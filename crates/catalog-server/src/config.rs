//! Server configuration for `Catalog`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! `MARATHON_URL` is the only required setting; without it the server refuses
//! to start, since no deployment could ever succeed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_CONCURRENT_DEPLOYS};

/// Default Vault address, matching the Vault CLI's own default.
const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Default port when neither `CATALOG_BIND_ADDR` nor `PORT` is set.
const DEFAULT_PORT: u16 = 8080;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("required environment variable {key} is not set")]
    Missing { key: &'static str },

    /// A variable is set but cannot be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Base URL of the Vault server.
    pub vault_addr: String,
    /// PEM file with an extra CA certificate to trust for Vault.
    pub vault_ca_cert: Option<PathBuf>,
    /// Skip TLS certificate verification for Vault.
    pub vault_skip_verify: bool,
    /// Base URL of the Marathon API.
    pub marathon_url: String,
    /// Optional Marathon HTTP basic auth.
    pub marathon_credentials: Option<MarathonCredentials>,
    /// Timeout applied to every upstream HTTP request.
    pub request_timeout: Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Maximum number of deploy requests processed at once.
    pub max_concurrent_deploys: usize,
}

/// HTTP basic auth credentials for Marathon.
#[derive(Clone)]
pub struct MarathonCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for MarathonCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarathonCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`, default: `8080`)
    /// - `CATALOG_BIND_ADDR`: full bind address (overrides `PORT`)
    /// - `CATALOG_LOG_LEVEL`: log filter (default: `info`)
    /// - `VAULT_ADDR`: Vault base URL (default: `https://127.0.0.1:8200`)
    /// - `VAULT_CACERT`: PEM CA certificate to trust for Vault
    /// - `VAULT_SKIP_VERIFY`: disable Vault TLS verification (default: `false`)
    /// - `MARATHON_URL`: Marathon base URL (required)
    /// - `MARATHON_USER` / `MARATHON_PASSWORD`: optional basic auth
    /// - `CATALOG_REQUEST_TIMEOUT`: upstream timeout in seconds (default: `30`)
    /// - `CATALOG_MAX_BODY_BYTES`: request body limit (default: `1048576`)
    /// - `CATALOG_MAX_CONCURRENT_DEPLOYS`: in-flight deploy limit (default: `64`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `MARATHON_URL` is missing or any value is
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Priority: CATALOG_BIND_ADDR > PORT > default 0.0.0.0:8080
        let bind_addr = if let Some(addr) = get("CATALOG_BIND_ADDR") {
            addr.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                key: "CATALOG_BIND_ADDR",
                value: addr.clone(),
                reason: e.to_string(),
            })?
        } else {
            let port = match get("PORT") {
                Some(p) => parse_number::<u16>("PORT", &p)?,
                None => DEFAULT_PORT,
            };
            SocketAddr::from(([0, 0, 0, 0], port))
        };

        let log_level = get("CATALOG_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let vault_addr = base_url(
            "VAULT_ADDR",
            get("VAULT_ADDR").unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_owned()),
        )?;

        let vault_ca_cert = get("VAULT_CACERT").map(PathBuf::from);

        let vault_skip_verify = match get("VAULT_SKIP_VERIFY") {
            Some(v) => parse_bool("VAULT_SKIP_VERIFY", &v)?,
            None => false,
        };

        let marathon_url = base_url(
            "MARATHON_URL",
            get("MARATHON_URL").ok_or(ConfigError::Missing {
                key: "MARATHON_URL",
            })?,
        )?;

        let marathon_credentials = get("MARATHON_USER").map(|username| MarathonCredentials {
            username,
            password: lookup("MARATHON_PASSWORD").unwrap_or_default(),
        });

        let request_timeout = Duration::from_secs(match get("CATALOG_REQUEST_TIMEOUT") {
            Some(v) => parse_number("CATALOG_REQUEST_TIMEOUT", &v)?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        });

        let max_body_bytes = match get("CATALOG_MAX_BODY_BYTES") {
            Some(v) => parse_number("CATALOG_MAX_BODY_BYTES", &v)?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let max_concurrent_deploys = match get("CATALOG_MAX_CONCURRENT_DEPLOYS") {
            Some(v) => parse_number("CATALOG_MAX_CONCURRENT_DEPLOYS", &v)?,
            None => DEFAULT_MAX_CONCURRENT_DEPLOYS,
        };

        Ok(Self {
            bind_addr,
            log_level,
            vault_addr,
            vault_ca_cert,
            vault_skip_verify,
            marathon_url,
            marathon_credentials,
            request_timeout,
            max_body_bytes,
            max_concurrent_deploys,
        })
    }
}

/// Parse a positive number.
fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let parsed: T = value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_owned(),
        reason: e.to_string(),
    })?;
    if parsed == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_owned(),
            reason: "must be greater than zero".to_owned(),
        });
    }
    Ok(parsed)
}

/// Parse a boolean flag the way the Vault CLI does.
fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" => Ok(true),
        "0" | "f" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_owned(),
            reason: "expected true or false".to_owned(),
        }),
    }
}

/// Require a single `http(s)://` URL and strip trailing slashes.
fn base_url(key: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key,
            value,
            reason: "must start with http:// or https://".to_owned(),
        });
    }
    if trimmed.contains(',') {
        return Err(ConfigError::Invalid {
            key,
            value,
            reason: "only a single host is supported".to_owned(),
        });
    }
    Ok(trimmed.to_owned())
}
