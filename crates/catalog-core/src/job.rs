//! Job specifications and batch decoding.
//!
//! A job is an orchestrator application definition. Only `id` and `env` are
//! interpreted here; every other field is carried through untouched and sent
//! back to the orchestrator exactly as the caller wrote it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::env::{json_kind, EnvironmentMap};
use crate::error::PayloadError;

/// A single workload definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Application id, e.g. `/payments/api`.
    pub id: String,
    /// Environment variables. A missing or `null` field decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub env: EnvironmentMap,
    /// All other application fields, passed through opaquely.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobSpec {
    /// Create a job with the given id and environment and no other fields.
    pub fn new(id: impl Into<String>, env: EnvironmentMap) -> Self {
        Self {
            id: id.into(),
            env,
            extra: Map::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<EnvironmentMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<EnvironmentMap>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a request body into a non-empty job batch.
///
/// Accepts either one job object or an array of job objects. The batch is
/// all-or-nothing: one invalid job rejects the whole payload.
///
/// # Errors
///
/// Returns [`PayloadError`] describing the first problem found.
pub fn decode_batch(raw: &[u8]) -> Result<Vec<JobSpec>, PayloadError> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| PayloadError::InvalidJson {
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(_) => Ok(vec![decode_job(0, value)?]),
        Value::Array(items) => {
            if items.is_empty() {
                return Err(PayloadError::EmptyBatch);
            }
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| decode_job(index, item))
                .collect()
        }
        other => Err(PayloadError::UnexpectedShape {
            found: json_kind(&other),
        }),
    }
}

fn decode_job(index: usize, value: Value) -> Result<JobSpec, PayloadError> {
    if !value.is_object() {
        return Err(PayloadError::InvalidJob {
            index,
            reason: format!("expected a job object, found {}", json_kind(&value)),
        });
    }
    serde_json::from_value(value).map_err(|e| PayloadError::InvalidJob {
        index,
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_single_object() {
        let jobs = decode_batch(br#"{"id": "/web", "env": {"PORT": "8080"}}"#).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "/web");
        assert_eq!(jobs[0].env.get("PORT").map(String::as_str), Some("8080"));
    }

    #[test]
    fn decodes_array_in_order() {
        let jobs = decode_batch(br#"[{"id": "/a"}, {"id": "/b"}, {"id": "/c"}]"#).unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, ["/a", "/b", "/c"]);
    }

    #[test]
    fn missing_or_null_env_is_empty() {
        let jobs = decode_batch(br#"[{"id": "/a"}, {"id": "/b", "env": null}]"#).unwrap();
        assert!(jobs[0].env.is_empty());
        assert!(jobs[1].env.is_empty());
    }

    #[test]
    fn unknown_fields_round_trip_untouched() {
        let body = json!({
            "id": "/web",
            "cmd": "python3 -m http.server 8080",
            "cpus": 0.25,
            "instances": 2,
            "container": { "docker": { "image": "python:3" } },
            "env": { "PORT": "8080" }
        });
        let jobs = decode_batch(body.to_string().as_bytes()).unwrap();
        assert_eq!(serde_json::to_value(&jobs[0]).unwrap(), body);
    }

    #[test]
    fn bare_string_is_rejected() {
        let err = decode_batch(br#""just a string""#).unwrap_err();
        assert_eq!(err, PayloadError::UnexpectedShape { found: "a string" });
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = decode_batch(b"{not json").unwrap_err();
        assert!(matches!(err, PayloadError::InvalidJson { .. }));
    }

    #[test]
    fn empty_array_is_rejected() {
        assert_eq!(decode_batch(b"[]").unwrap_err(), PayloadError::EmptyBatch);
    }

    #[test]
    fn one_bad_job_rejects_the_batch() {
        let err = decode_batch(br#"[{"id": "/a"}, {"cmd": "no id"}]"#).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidJob { index: 1, .. }));
    }

    #[test]
    fn non_object_item_is_rejected() {
        let err = decode_batch(br#"[{"id": "/a"}, 42]"#).unwrap_err();
        assert_eq!(
            err,
            PayloadError::InvalidJob {
                index: 1,
                reason: "expected a job object, found a number".to_owned()
            }
        );
    }

    #[test]
    fn non_string_env_value_is_rejected() {
        let err = decode_batch(br#"{"id": "/a", "env": {"PORT": 8080}}"#).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidJob { index: 0, .. }));
    }
}
