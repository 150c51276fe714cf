//! The unit of data on a `main` edge.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single item flowing along a `main` edge.
///
/// `json` is an opaque tree the engine never interprets; `binary` carries
/// named attachments that must survive passthrough nodes untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub json: Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub binary: Option<IndexMap<String, BinaryData>>,
}

impl Item {
  /// Wrap a bare JSON value as an item with no binary payload.
  pub fn from_json(json: Value) -> Self {
    Self { json, binary: None }
  }
}

/// A named binary attachment on an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryData {
  /// Base64-encoded payload.
  pub data: String,
  #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
  pub mime_type: Option<String>,
  #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
  pub file_name: Option<String>,
}

/// Normalize initial invocation data into an item sequence.
///
/// An object becomes a one-item sequence `[{json: data}]`. An array is
/// item-normalized element by element: elements that already look like
/// items (objects with a `json` field) are taken as-is, anything else is
/// wrapped. `null` yields an empty sequence.
pub fn wrap_initial_data(data: &Value) -> Vec<Item> {
  match data {
    Value::Null => Vec::new(),
    Value::Array(elements) => elements.iter().map(normalize_element).collect(),
    other => vec![Item::from_json(other.clone())],
  }
}

fn normalize_element(element: &Value) -> Item {
  if element.get("json").is_some() {
    if let Ok(item) = serde_json::from_value::<Item>(element.clone()) {
      return item;
    }
  }
  Item::from_json(element.clone())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn object_becomes_single_item() {
    let items = wrap_initial_data(&json!({"x": 1}));
    assert_eq!(items, vec![Item::from_json(json!({"x": 1}))]);
  }

  #[test]
  fn array_of_items_passes_through() {
    let items = wrap_initial_data(&json!([{"json": {"a": 1}}, {"b": 2}]));
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].json, json!({"a": 1}));
    assert_eq!(items[1].json, json!({"b": 2}));
  }

  #[test]
  fn null_becomes_empty_sequence() {
    assert!(wrap_initial_data(&Value::Null).is_empty());
  }

  #[test]
  fn binary_round_trips() {
    let raw = json!({
      "json": {"name": "report"},
      "binary": {"file": {"data": "aGVsbG8=", "mimeType": "text/plain", "fileName": "a.txt"}}
    });
    let item: Item = serde_json::from_value(raw.clone()).expect("item should parse");
    let binary = item.binary.as_ref().expect("binary should be present");
    assert_eq!(binary["file"].mime_type.as_deref(), Some("text/plain"));
    assert_eq!(serde_json::to_value(&item).expect("item should serialize"), raw);
  }
}
