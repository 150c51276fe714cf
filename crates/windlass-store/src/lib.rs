//! Windlass Store
//!
//! This crate provides the storage trait and implementations for
//! user-automation records: OAuth tokens, per-pair polling state
//! (cursor + processed set), activity flags and run history.
//!
//! Updates are deliberately per-column so the credential-refresh path
//! and the tick-cursor-persist path never clobber each other's fields;
//! row-level writes are last-writer-wins.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{AutomationData, RunRecord, UserAutomation};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// A stored JSON column could not be decoded.
  #[error("corrupt stored value: {0}")]
  Corrupt(#[from] serde_json::Error),
}

/// Storage operations over user-automation records.
#[async_trait]
pub trait Store: Send + Sync {
  /// Insert or replace a record.
  async fn upsert(&self, record: &UserAutomation) -> Result<(), StoreError>;

  /// Load the record for one (user, automation) pair.
  async fn get(&self, user_id: &str, automation_id: &str) -> Result<UserAutomation, StoreError>;

  /// All records with `is_active = true`, for startup resume.
  async fn list_active(&self) -> Result<Vec<UserAutomation>, StoreError>;

  /// Flip the activity flag.
  async fn set_active(&self, id: &str, active: bool) -> Result<(), StoreError>;

  /// Write back refreshed tokens.
  async fn update_tokens(
    &self,
    id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    token_expiry: Option<DateTime<Utc>>,
  ) -> Result<(), StoreError>;

  /// Persist polling state after a tick.
  async fn update_automation_data(&self, id: &str, data: &AutomationData)
    -> Result<(), StoreError>;

  /// Increment the run counter and stamp the last run time.
  async fn record_run(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

  /// Append one entry to the run log.
  async fn insert_run(&self, run: &RunRecord) -> Result<(), StoreError>;

  /// Recent run-log entries for one record, newest first.
  async fn list_runs(&self, user_automation_id: &str) -> Result<Vec<RunRecord>, StoreError>;
}
