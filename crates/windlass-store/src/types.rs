use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row per (user, automation) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAutomation {
  pub id: String,
  pub user_id: String,
  pub automation_id: String,
  pub access_token: Option<String>,
  pub refresh_token: Option<String>,
  pub token_expiry: Option<DateTime<Utc>>,
  pub is_active: bool,
  /// User config used for `{{NAME}}` parameter substitution.
  pub parameters: Value,
  pub automation_data: AutomationData,
  pub run_count: i64,
  pub last_run_at: Option<DateTime<Utc>>,
}

/// Incremental polling state. `processed_files` is append-only within a
/// polling series; `last_poll_time` is non-decreasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationData {
  #[serde(rename = "lastPollTime", default, skip_serializing_if = "Option::is_none")]
  pub last_poll_time: Option<DateTime<Utc>>,
  #[serde(rename = "processedFiles", default)]
  pub processed_files: Vec<String>,
  #[serde(rename = "lastRun", default, skip_serializing_if = "Option::is_none")]
  pub last_run: Option<DateTime<Utc>>,
  #[serde(rename = "totalProcessed", default)]
  pub total_processed: u64,
}

/// One entry in the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RunRecord {
  pub id: String,
  pub user_automation_id: String,
  pub started_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
  pub success: bool,
  pub error: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn automation_data_uses_wire_field_names() {
    let data = AutomationData {
      last_poll_time: None,
      processed_files: vec!["F1".to_string()],
      last_run: None,
      total_processed: 3,
    };
    assert_eq!(
      serde_json::to_value(&data).expect("should serialize"),
      json!({"processedFiles": ["F1"], "totalProcessed": 3})
    );
  }
}
