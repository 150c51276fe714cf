//! Candidate filtering for polling triggers.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use windlass_workflow::Item;

/// Filter a polling trigger's candidate set down to genuinely new
/// records: `timestamp > cursor` and natural key not yet processed.
///
/// `key_field` names the natural-key field in each item's json (e.g.
/// `id` for Drive files); `timestamp_field` the creation timestamp,
/// accepted as RFC 3339 text or epoch seconds. Candidates without a key
/// are dropped; candidates without a readable timestamp pass the cursor
/// check (dedup still applies).
pub fn filter_candidates(
  candidates: Vec<Item>,
  cursor: Option<DateTime<Utc>>,
  processed: &HashSet<String>,
  key_field: &str,
  timestamp_field: &str,
) -> Vec<Item> {
  candidates
    .into_iter()
    .filter(|item| {
      let Some(key) = natural_key(&item.json, key_field) else {
        return false;
      };
      if processed.contains(&key) {
        return false;
      }
      match (cursor, read_timestamp(&item.json, timestamp_field)) {
        (Some(cursor), Some(created)) => created > cursor,
        _ => true,
      }
    })
    .collect()
}

fn natural_key(json: &Value, key_field: &str) -> Option<String> {
  match json.get(key_field)? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn read_timestamp(json: &Value, timestamp_field: &str) -> Option<DateTime<Utc>> {
  match json.get(timestamp_field)? {
    Value::String(s) => DateTime::parse_from_rfc3339(s)
      .ok()
      .map(|dt| dt.with_timezone(&Utc)),
    Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use serde_json::json;

  fn item(id: &str, created: &str) -> Item {
    Item::from_json(json!({"id": id, "createdTime": created}))
  }

  #[test]
  fn filters_by_cursor_and_processed_set() {
    let cursor = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).single();
    let processed: HashSet<String> = ["F1".to_string()].into_iter().collect();

    let fresh = filter_candidates(
      vec![
        item("F1", "2026-07-01T13:00:00Z"),
        item("F2", "2026-07-01T13:00:00Z"),
        item("F3", "2026-07-01T11:00:00Z"),
      ],
      cursor,
      &processed,
      "id",
      "createdTime",
    );

    let ids: Vec<&str> = fresh.iter().filter_map(|i| i.json["id"].as_str()).collect();
    assert_eq!(ids, ["F2"], "F1 is deduplicated, F3 predates the cursor");
  }

  #[test]
  fn replay_with_same_state_is_idempotent() {
    let cursor = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).single();
    let processed = HashSet::new();
    let candidates = vec![item("F1", "2026-07-01T13:00:00Z")];

    let first = filter_candidates(candidates.clone(), cursor, &processed, "id", "createdTime");
    let second = filter_candidates(candidates, cursor, &processed, "id", "createdTime");
    assert_eq!(first, second);
  }

  #[test]
  fn missing_key_drops_candidate() {
    let fresh = filter_candidates(
      vec![Item::from_json(json!({"createdTime": "2026-07-01T13:00:00Z"}))],
      None,
      &HashSet::new(),
      "id",
      "createdTime",
    );
    assert!(fresh.is_empty());
  }

  #[test]
  fn epoch_timestamps_are_accepted() {
    let cursor = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).single();
    let fresh = filter_candidates(
      vec![Item::from_json(json!({"id": "F9", "createdTime": 1_785_000_000}))],
      cursor,
      &HashSet::new(),
      "id",
      "createdTime",
    );
    assert_eq!(fresh.len(), 1);
  }
}
