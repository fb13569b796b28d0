//! Request fingerprints.

use serde::Serialize;
use serde_json::Value;

/// Build the cache key for a request: `"<endpoint>:<json params>"`.
///
/// Object field names are sorted (at every depth) before serialization, so
/// two parameter sets that differ only in insertion order share a key.
/// Missing params (`null`) are written as `{}`. Params that cannot be
/// represented as JSON (e.g. a map with non-string keys) have no key.
pub fn generate_key<P: Serialize + ?Sized>(endpoint: &str, params: &P) -> Result<String, serde_json::Error> {
  let key = match serde_json::to_value(params)? {
    Value::Null => format!("{}:{{}}", endpoint),
    other => format!("{}:{}", endpoint, write_sorted(&other)),
  };
  Ok(key)
}

// Map iteration order depends on serde_json's `preserve_order` feature.
fn write_sorted(value: &Value) -> String {
  match value {
    Value::Object(map) => {
      let mut fields: Vec<(&String, &Value)> = map.iter().collect();
      fields.sort_by(|a, b| a.0.cmp(b.0));
      let fields: Vec<String> = fields
        .into_iter()
        .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), write_sorted(v)))
        .collect();
      format!("{{{}}}", fields.join(","))
    }
    Value::Array(items) => {
      let items: Vec<String> = items.iter().map(write_sorted).collect();
      format!("[{}]", items.join(","))
    }
    other => other.to_string(),
  }
}
