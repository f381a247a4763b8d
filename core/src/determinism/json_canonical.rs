use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use serde_json::Value;

// Canonical JSON used for audit hashing:
// - keys sorted lexicographically at every depth
// - compact separators
// - integer numbers only
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    let normalized = normalize_value(v)?;
    Ok(serde_json::to_string(&normalized)?.into_bytes())
}

pub fn to_canonical_string<T: Serialize>(value: &T) -> CoreResult<String> {
    let bytes = to_canonical_bytes(value)?;
    String::from_utf8(bytes)
        .map_err(|e| CoreError::DeterminismViolation(format!("canonical JSON not UTF-8: {}", e)))
}

fn normalize_value(v: Value) -> CoreResult<Value> {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::new();
            for (k, vv) in entries {
                out.insert(k, normalize_value(vv)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(arr) => arr
            .into_iter()
            .map(normalize_value)
            .collect::<CoreResult<Vec<_>>>()
            .map(Value::Array),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
        Value::Number(_) => Err(CoreError::DeterminismViolation(
            "canonical JSON forbids non-integer numbers".to_string(),
        )),
        other => Ok(other),
    }
}
