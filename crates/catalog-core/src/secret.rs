//! Secret paths, secret bundles, and the [`SecretStore`] capability.
//!
//! A request names a secret; the path is always `/secret/{name}`. The store
//! returns the raw secret data, of which only the `env` field is decoded into
//! the overlay applied to every job in the batch.

use std::fmt;

use serde_json::{Map, Value};

use crate::env::{env_from_json, EnvironmentMap};
use crate::error::{EnvDecodeError, SecretNameError, SecretStoreError};
use crate::token::AccessToken;

/// Mount prefix every secret path starts with.
pub const SECRET_MOUNT_PREFIX: &str = "/secret/";

/// Maximum number of `/`-separated segments in a secret name.
const MAX_NAME_SEGMENTS: usize = 10;

/// Location of a secret in the store, derived from a request-supplied name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretPath(String);

impl SecretPath {
    /// Derive `/secret/{name}`.
    ///
    /// - Only alphanumeric, `_`, `-`, `.`, `/` characters allowed.
    /// - No `..` path traversal and no null bytes.
    /// - No leading, trailing, or repeated `/`.
    /// - Maximum 10 segments.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNameError`] if the name violates any rule above.
    pub fn for_name(name: &str) -> Result<Self, SecretNameError> {
        let reject = |reason: &'static str| SecretNameError {
            name: name.to_owned(),
            reason,
        };

        if name.is_empty() {
            return Err(reject("secret name must not be empty"));
        }
        if name.contains("..") {
            return Err(reject("path traversal (..) is not allowed"));
        }
        if name.contains('\0') {
            return Err(reject("null bytes are not allowed"));
        }
        if !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/'))
        {
            return Err(reject(
                "secret name may only contain alphanumeric characters, '_', '-', '.', and '/'",
            ));
        }
        if name.split('/').any(str::is_empty) {
            return Err(reject("secret name must not have empty segments"));
        }
        if name.split('/').count() > MAX_NAME_SEGMENTS {
            return Err(reject("secret name exceeds maximum depth of 10 segments"));
        }

        Ok(Self(format!("{SECRET_MOUNT_PREFIX}{name}")))
    }

    /// The full path, e.g. `/secret/payments`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The environment overlay read from the secret store for one request.
///
/// `Debug` lists keys only; values never appear in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretBundle {
    env: EnvironmentMap,
}

impl SecretBundle {
    /// Wrap an already-decoded environment overlay.
    pub fn new(env: EnvironmentMap) -> Self {
        Self { env }
    }

    /// Decode raw secret data into a bundle.
    ///
    /// Only the `env` field (matched case-insensitively, so `Env` works too)
    /// is read; other fields are ignored. A missing or `null` `env` yields an
    /// empty bundle.
    ///
    /// # Errors
    ///
    /// Returns [`EnvDecodeError`] if `env` is present but is not an object of
    /// scalar values.
    pub fn from_secret_data(data: &Map<String, Value>) -> Result<Self, EnvDecodeError> {
        let env_field = data
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("env"))
            .map(|(_, value)| value);

        match env_field {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => env_from_json(value).map(Self::new),
        }
    }

    /// The overlay to merge into each job's environment.
    pub fn env(&self) -> &EnvironmentMap {
        &self.env
    }

    /// Number of variables in the bundle.
    pub fn len(&self) -> usize {
        self.env.len()
    }

    /// Whether the bundle holds no variables.
    pub fn is_empty(&self) -> bool {
        self.env.is_empty()
    }
}

impl From<EnvironmentMap> for SecretBundle {
    fn from(env: EnvironmentMap) -> Self {
        Self::new(env)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle")
            .field("keys", &self.env.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Read access to a secret store.
///
/// Implementations must be safe to share across concurrent requests
/// (`Send + Sync`) and must not cache bundles between calls.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Read the bundle at `path` using the caller's token.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::NotFound`] if nothing exists at `path`,
    /// [`SecretStoreError::Forbidden`] if the token is rejected, and
    /// [`SecretStoreError::Unavailable`] or [`SecretStoreError::InvalidData`]
    /// for transport and decode failures.
    async fn read(
        &self,
        path: &SecretPath,
        token: &AccessToken,
    ) -> Result<SecretBundle, SecretStoreError>;
}
