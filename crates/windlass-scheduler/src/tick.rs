//! One polling iteration.

use std::collections::HashSet;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use windlass_credential::{Refresher, StoredTokens};
use windlass_engine::{Engine, ExecutionContext};
use windlass_prepare::{inject_tokens, normalize_tokens, prepare_workflow};
use windlass_store::{AutomationData, RunRecord, Store, UserAutomation};

use crate::error::SchedulerError;
use crate::template::AutomationTemplate;

/// What one tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
  pub success: bool,
  /// New natural keys the trigger emitted this tick.
  pub new_items: usize,
}

pub(crate) struct TickDeps<'a> {
  pub store: &'a dyn Store,
  pub engine: &'a Engine,
  pub refresher: &'a Refresher,
}

/// Run one tick: refresh tokens on demand, prepare and inject the
/// template, execute the engine, then persist the advanced cursor and
/// the grown processed set.
///
/// The next cursor is captured *before* the engine runs, so events that
/// arrive during execution fall into the next tick's window instead of
/// being lost.
#[instrument(
  name = "tick",
  skip(deps, record, template),
  fields(user_id = %record.user_id, automation_id = %record.automation_id)
)]
pub(crate) async fn run_tick(
  deps: &TickDeps<'_>,
  record: &UserAutomation,
  template: &AutomationTemplate,
) -> Result<TickOutcome, SchedulerError> {
  let started_at = Utc::now();
  info!("tick_started");

  // Tokens first; a refresh failure is a hard error for this tick.
  let access_token =
    record
      .access_token
      .clone()
      .ok_or_else(|| SchedulerError::MissingTokens {
        user_id: record.user_id.clone(),
        automation_id: record.automation_id.clone(),
      })?;
  let mut stored = StoredTokens {
    access_token,
    refresh_token: record.refresh_token.clone(),
    token_expiry: record.token_expiry,
  };
  if stored.needs_refresh(started_at) {
    let refreshed = deps.refresher.refresh(&template.provider, &stored).await?;
    // A failed write-back is logged; the tick proceeds on the in-memory
    // values.
    if let Err(e) = deps
      .store
      .update_tokens(
        &record.id,
        &refreshed.access_token,
        refreshed.refresh_token.as_deref(),
        refreshed.token_expiry,
      )
      .await
    {
      warn!(error = %e, "token_persist_failed");
    }
    stored = StoredTokens {
      access_token: refreshed.access_token,
      refresh_token: refreshed.refresh_token,
      token_expiry: refreshed.token_expiry,
    };
  }

  // Prepare: parameter substitution, credential resolution, injection.
  let params = parameter_map(&record.parameters);
  let prepared = prepare_workflow(&template.workflow, &params, &template.developer_keys);

  let mut raw_tokens = IndexMap::new();
  raw_tokens.insert(provider_token_name(template).to_string(), stored.access_token.clone());
  let mut tokens = normalize_tokens(&raw_tokens, &IndexMap::new());
  tokens.extend(prepared.resolved_tokens.clone());

  let mut workflow = prepared.workflow;
  inject_tokens(&mut workflow, &tokens)?;

  let trigger_name = workflow
    .nodes
    .iter()
    .find(|n| n.is_trigger())
    .map(|n| n.name.clone());
  let processed: HashSet<String> = record
    .automation_data
    .processed_files
    .iter()
    .cloned()
    .collect();
  let initial_data = json!({
    "config": record.parameters,
    "userId": record.user_id,
    "automationId": record.automation_id,
  });

  // Captured before the engine runs; becomes the next cursor.
  let execution_start_time = Utc::now();

  let ctx = ExecutionContext::new(workflow, initial_data, tokens)
    .with_polling_state(record.automation_data.last_poll_time, processed.clone());
  let result = deps.engine.invoke(ctx, CancellationToken::new()).await;

  if let Some(error) = &result.error {
    // Abort-class failure: the trigger may not have polled, so the
    // cursor must not advance. Log the run and surface the error.
    log_run(deps, record, started_at, false, Some(error.clone())).await;
    return Err(SchedulerError::TickFailed(error.clone()));
  }

  // Harvest the trigger's output into the processed set.
  let mut processed_files = record.automation_data.processed_files.clone();
  let mut new_items = 0;
  if let Some(name) = &trigger_name {
    for item in result.outputs.get(name).map(Vec::as_slice).unwrap_or(&[]) {
      let Some(key) = natural_key(&item.json) else {
        continue;
      };
      if !processed.contains(&key) && !processed_files.contains(&key) {
        processed_files.push(key);
        new_items += 1;
      }
    }
  }

  let data = AutomationData {
    last_poll_time: Some(execution_start_time),
    processed_files,
    last_run: Some(started_at),
    total_processed: record.automation_data.total_processed + new_items as u64,
  };
  if let Err(e) = deps.store.update_automation_data(&record.id, &data).await {
    warn!(error = %e, "state_persist_failed");
  }
  log_run(deps, record, started_at, result.success, None).await;

  info!(new_items, success = result.success, "tick_completed");
  Ok(TickOutcome {
    success: result.success,
    new_items,
  })
}

/// Record the run best-effort: counter bump plus a run-log entry.
async fn log_run(
  deps: &TickDeps<'_>,
  record: &UserAutomation,
  started_at: chrono::DateTime<Utc>,
  success: bool,
  error: Option<String>,
) {
  if let Err(e) = deps.store.record_run(&record.id, started_at).await {
    warn!(error = %e, "run_counter_persist_failed");
  }
  let run = RunRecord {
    id: uuid::Uuid::new_v4().to_string(),
    user_automation_id: record.id.clone(),
    started_at,
    finished_at: Some(Utc::now()),
    success,
    error,
  };
  if let Err(e) = deps.store.insert_run(&run).await {
    warn!(error = %e, "run_log_persist_failed");
  }
}

fn parameter_map(parameters: &Value) -> IndexMap<String, Value> {
  match parameters {
    Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    _ => IndexMap::new(),
  }
}

/// Raw token name the record's access token enters the bag under; the
/// normalization table collapses it to the canonical name.
fn provider_token_name(template: &AutomationTemplate) -> &'static str {
  use windlass_credential::Provider;
  match template.provider {
    Provider::Google => "google_access_token",
    Provider::TikTok => "tiktok_access_token",
    Provider::Unknown(_) => "access_token",
  }
}

fn natural_key(json: &Value) -> Option<String> {
  match json.get("id")? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}
