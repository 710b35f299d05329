use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FailureKind, Operation, WorkerError};

/// A window the typing run can target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSelection {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonePreset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismReport {
    /// 0.0 to 1.0.
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub sources: Vec<PlagiarismSource>,
    #[serde(default)]
    pub highlighted_text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismSource {
    pub url: String,
    #[serde(default)]
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number id, found {other}"
        ))),
    }
}

/// Strips the `{"success": bool, "data": X}` envelope the worker wraps results in.
///
/// A `success: false` envelope is a worker-reported failure.
pub(crate) fn unwrap_envelope(operation: Operation, value: Value) -> Result<Value, WorkerError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };
    let Some(success) = map.get("success").and_then(Value::as_bool) else {
        return Ok(Value::Object(map));
    };
    if !success {
        let message = ["error", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{operation} worker reported failure"));
        return Err(WorkerError::new(operation, FailureKind::Reported, message));
    }
    Ok(map.remove("data").unwrap_or(Value::Null))
}

/// Decodes the first result element, falling back to `T::default()` when the
/// worker produced none.
pub(crate) fn decode<T>(operation: Operation, results: Vec<Value>) -> Result<T, WorkerError>
where
    T: DeserializeOwned + Default,
{
    match first_payload(operation, results)? {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|err| {
            WorkerError::new(
                operation,
                FailureKind::ProtocolViolation,
                format!("{operation} worker returned an unexpected result: {err}"),
            )
        }),
    }
}

/// Decodes a text result given either as a bare string or under `field`.
pub(crate) fn decode_text(
    operation: Operation,
    results: Vec<Value>,
    field: &str,
) -> Result<String, WorkerError> {
    match first_payload(operation, results)? {
        None => Ok(String::new()),
        Some(Value::String(text)) => Ok(text),
        Some(Value::Object(mut map)) => match map.remove(field) {
            Some(Value::String(text)) => Ok(text),
            Some(Value::Null) | None => Ok(String::new()),
            Some(other) => Err(unexpected(operation, field, &other)),
        },
        Some(other) => Err(unexpected(operation, field, &other)),
    }
}

fn first_payload(operation: Operation, results: Vec<Value>) -> Result<Option<Value>, WorkerError> {
    let Some(first) = results.into_iter().next() else {
        return Ok(None);
    };
    match unwrap_envelope(operation, first)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

fn unexpected(operation: Operation, field: &str, value: &Value) -> WorkerError {
    WorkerError::new(
        operation,
        FailureKind::ProtocolViolation,
        format!("{operation} worker returned {value} where text or `{field}` was expected"),
    )
}
