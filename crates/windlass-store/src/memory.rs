//! In-memory store for tests and single-process runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{AutomationData, RunRecord, UserAutomation};
use crate::{Store, StoreError};

#[derive(Default)]
pub struct MemoryStore {
  records: RwLock<HashMap<String, UserAutomation>>,
  runs: RwLock<Vec<RunRecord>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_record<T>(
    &self,
    id: &str,
    apply: impl FnOnce(&mut UserAutomation) -> T,
  ) -> Result<T, StoreError> {
    let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
    let record = records
      .get_mut(id)
      .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    Ok(apply(record))
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn upsert(&self, record: &UserAutomation) -> Result<(), StoreError> {
    let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
    records.insert(record.id.clone(), record.clone());
    Ok(())
  }

  async fn get(&self, user_id: &str, automation_id: &str) -> Result<UserAutomation, StoreError> {
    let records = self.records.read().unwrap_or_else(|e| e.into_inner());
    records
      .values()
      .find(|r| r.user_id == user_id && r.automation_id == automation_id)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(format!("{user_id}/{automation_id}")))
  }

  async fn list_active(&self) -> Result<Vec<UserAutomation>, StoreError> {
    let records = self.records.read().unwrap_or_else(|e| e.into_inner());
    Ok(records.values().filter(|r| r.is_active).cloned().collect())
  }

  async fn set_active(&self, id: &str, active: bool) -> Result<(), StoreError> {
    self.with_record(id, |record| record.is_active = active)
  }

  async fn update_tokens(
    &self,
    id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    token_expiry: Option<DateTime<Utc>>,
  ) -> Result<(), StoreError> {
    self.with_record(id, |record| {
      record.access_token = Some(access_token.to_string());
      if let Some(refresh) = refresh_token {
        record.refresh_token = Some(refresh.to_string());
      }
      record.token_expiry = token_expiry;
    })
  }

  async fn update_automation_data(
    &self,
    id: &str,
    data: &AutomationData,
  ) -> Result<(), StoreError> {
    self.with_record(id, |record| record.automation_data = data.clone())
  }

  async fn record_run(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
    self.with_record(id, |record| {
      record.run_count += 1;
      record.last_run_at = Some(at);
    })
  }

  async fn insert_run(&self, run: &RunRecord) -> Result<(), StoreError> {
    let mut runs = self.runs.write().unwrap_or_else(|e| e.into_inner());
    runs.push(run.clone());
    Ok(())
  }

  async fn list_runs(&self, user_automation_id: &str) -> Result<Vec<RunRecord>, StoreError> {
    let runs = self.runs.read().unwrap_or_else(|e| e.into_inner());
    let mut matching: Vec<RunRecord> = runs
      .iter()
      .filter(|r| r.user_automation_id == user_automation_id)
      .cloned()
      .collect();
    matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(matching)
  }
}
