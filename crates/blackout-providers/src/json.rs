//! Small helpers for walking `serde_json` documents with path-carrying
//! errors.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub(crate) fn parse(raw: &[u8]) -> Result<Value> {
  serde_json::from_slice(raw).map_err(|e| Error::format("$", e.to_string()))
}

pub(crate) fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
  value
    .as_object()
    .ok_or_else(|| Error::format(path, format!("expected object, found {}", kind(value))))
}

pub(crate) fn field<'a>(
  map: &'a Map<String, Value>,
  path: &str,
  key: &str,
) -> Result<&'a Value> {
  map
    .get(key)
    .ok_or_else(|| Error::format(path, format!("missing field `{key}`")))
}

pub(crate) fn child(path: &str, key: &str) -> String { format!("{path}.{key}") }

pub(crate) fn index(path: &str, i: usize) -> String { format!("{path}[{i}]") }

pub(crate) fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
