//! Environment maps and the secret overlay merge.
//!
//! A job's checked-in environment is the base; the secret bundle is the
//! overlay. Overlay values always win, so placeholder values committed to
//! source control are never deployed live.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::EnvDecodeError;

/// Environment variables by name.
///
/// Ordering carries no meaning; a `BTreeMap` just keeps serialized output
/// stable.
pub type EnvironmentMap = BTreeMap<String, String>;

/// Overlay `overlay` onto `base` in place.
///
/// Every overlay key ends up in `base` with the overlay's value, replacing any
/// existing value. Keys only in `base` are left untouched. Returns how many
/// existing `base` values were replaced.
pub fn merge(base: &mut EnvironmentMap, overlay: &EnvironmentMap) -> usize {
    let mut replaced = 0usize;
    for (key, value) in overlay {
        if base.insert(key.clone(), value.clone()).is_some() {
            replaced = replaced.saturating_add(1);
        }
    }
    replaced
}

/// Non-mutating form of [`merge`].
#[must_use]
pub fn merged(base: &EnvironmentMap, overlay: &EnvironmentMap) -> EnvironmentMap {
    let mut out = base.clone();
    merge(&mut out, overlay);
    out
}

/// Decode a JSON object into an environment map.
///
/// String values are taken as-is; numbers and booleans are stringified so
/// that secrets written as `PORT=8080` through the Vault CLI still decode.
/// Arrays, nested objects, and `null` values are rejected.
///
/// # Errors
///
/// Returns [`EnvDecodeError`] naming the first offending key.
pub fn env_from_json(value: &Value) -> Result<EnvironmentMap, EnvDecodeError> {
    let Value::Object(entries) = value else {
        return Err(EnvDecodeError::NotAnObject {
            found: json_kind(value),
        });
    };

    let mut env = EnvironmentMap::new();
    for (key, value) in entries {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(EnvDecodeError::InvalidValue {
                    key: key.clone(),
                    found: json_kind(other),
                });
            }
        };
        env.insert(key.clone(), text);
    }
    Ok(env)
}

/// Human-readable JSON type name for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
