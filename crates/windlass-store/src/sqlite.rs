//! SQLite-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::types::{AutomationData, RunRecord, UserAutomation};
use crate::{Store, StoreError};

pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

#[derive(sqlx::FromRow)]
struct UserAutomationRow {
  id: String,
  user_id: String,
  automation_id: String,
  access_token: Option<String>,
  refresh_token: Option<String>,
  token_expiry: Option<DateTime<Utc>>,
  is_active: bool,
  parameters: Json<Value>,
  automation_data: Json<AutomationData>,
  run_count: i64,
  last_run_at: Option<DateTime<Utc>>,
}

impl From<UserAutomationRow> for UserAutomation {
  fn from(row: UserAutomationRow) -> Self {
    Self {
      id: row.id,
      user_id: row.user_id,
      automation_id: row.automation_id,
      access_token: row.access_token,
      refresh_token: row.refresh_token,
      token_expiry: row.token_expiry,
      is_active: row.is_active,
      parameters: row.parameters.0,
      automation_data: row.automation_data.0,
      run_count: row.run_count,
      last_run_at: row.last_run_at,
    }
  }
}

const SELECT_COLUMNS: &str = "id, user_id, automation_id, access_token, refresh_token, \
  token_expiry, is_active, parameters, automation_data, run_count, last_run_at";

#[async_trait]
impl Store for SqliteStore {
  async fn upsert(&self, record: &UserAutomation) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO user_automations
        (id, user_id, automation_id, access_token, refresh_token, token_expiry,
         is_active, parameters, automation_data, run_count, last_run_at)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
      ON CONFLICT(id) DO UPDATE SET
        access_token = excluded.access_token,
        refresh_token = excluded.refresh_token,
        token_expiry = excluded.token_expiry,
        is_active = excluded.is_active,
        parameters = excluded.parameters,
        automation_data = excluded.automation_data,
        run_count = excluded.run_count,
        last_run_at = excluded.last_run_at
      "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.automation_id)
    .bind(&record.access_token)
    .bind(&record.refresh_token)
    .bind(record.token_expiry)
    .bind(record.is_active)
    .bind(Json(&record.parameters))
    .bind(Json(&record.automation_data))
    .bind(record.run_count)
    .bind(record.last_run_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn get(&self, user_id: &str, automation_id: &str) -> Result<UserAutomation, StoreError> {
    let row: Option<UserAutomationRow> = sqlx::query_as(&format!(
      "SELECT {SELECT_COLUMNS} FROM user_automations WHERE user_id = ? AND automation_id = ?"
    ))
    .bind(user_id)
    .bind(automation_id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(UserAutomation::from)
      .ok_or_else(|| StoreError::NotFound(format!("{user_id}/{automation_id}")))
  }

  async fn list_active(&self) -> Result<Vec<UserAutomation>, StoreError> {
    let rows: Vec<UserAutomationRow> = sqlx::query_as(&format!(
      "SELECT {SELECT_COLUMNS} FROM user_automations WHERE is_active = TRUE"
    ))
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(UserAutomation::from).collect())
  }

  async fn set_active(&self, id: &str, active: bool) -> Result<(), StoreError> {
    sqlx::query("UPDATE user_automations SET is_active = ? WHERE id = ?")
      .bind(active)
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn update_tokens(
    &self,
    id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    token_expiry: Option<DateTime<Utc>>,
  ) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      UPDATE user_automations
      SET access_token = ?,
          refresh_token = COALESCE(?, refresh_token),
          token_expiry = ?
      WHERE id = ?
      "#,
    )
    .bind(access_token)
    .bind(refresh_token)
    .bind(token_expiry)
    .bind(id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn update_automation_data(
    &self,
    id: &str,
    data: &AutomationData,
  ) -> Result<(), StoreError> {
    sqlx::query("UPDATE user_automations SET automation_data = ? WHERE id = ?")
      .bind(Json(data))
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn record_run(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
    sqlx::query("UPDATE user_automations SET run_count = run_count + 1, last_run_at = ? WHERE id = ?")
      .bind(at)
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn insert_run(&self, run: &RunRecord) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO runs (id, user_automation_id, started_at, finished_at, success, error)
      VALUES (?, ?, ?, ?, ?, ?)
      "#,
    )
    .bind(&run.id)
    .bind(&run.user_automation_id)
    .bind(run.started_at)
    .bind(run.finished_at)
    .bind(run.success)
    .bind(&run.error)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn list_runs(&self, user_automation_id: &str) -> Result<Vec<RunRecord>, StoreError> {
    let runs: Vec<RunRecord> = sqlx::query_as(
      r#"
      SELECT id, user_automation_id, started_at, finished_at, success, error
      FROM runs
      WHERE user_automation_id = ?
      ORDER BY started_at DESC
      "#,
    )
    .bind(user_automation_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(runs)
  }
}
