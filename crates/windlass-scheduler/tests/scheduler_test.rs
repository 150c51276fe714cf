//! Supervisor tests over the in-memory store and a stub polling trigger.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use indexmap::IndexMap;
use serde_json::json;
use windlass_credential::{ClientConfig, Provider, Refresher};
use windlass_engine::{Engine, ExecutionContext, ExecutorRegistry, NodeError, NodeExecutor};
use windlass_nodes::{NoOp, filter_candidates};
use windlass_scheduler::{
  AutomationTemplate, PollConfig, PollSupervisor, SchedulerError, TemplateSource,
};
use windlass_store::{AutomationData, MemoryStore, Store, UserAutomation};
use windlass_workflow::{Item, Node, Workflow};

/// Polling trigger over a shared external record set. Filters to
/// `created > cursor` and key not yet processed, like a real connector.
struct ExternalPollTrigger {
  records: Arc<Mutex<Vec<Item>>>,
}

#[async_trait]
impl NodeExecutor for ExternalPollTrigger {
  async fn execute(
    &self,
    _node: &Node,
    _input: Vec<Item>,
    ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    let candidates = self.records.lock().unwrap_or_else(|e| e.into_inner()).clone();
    Ok(filter_candidates(
      candidates,
      ctx.polling_cursor,
      &ctx.processed_set,
      "id",
      "createdTime",
    ))
  }
}

struct StaticTemplates {
  template: AutomationTemplate,
}

#[async_trait]
impl TemplateSource for StaticTemplates {
  async fn load(&self, _automation_id: &str) -> Result<AutomationTemplate, SchedulerError> {
    Ok(self.template.clone())
  }
}

fn poll_workflow(trigger_type: &str) -> Workflow {
  serde_json::from_value(json!({
    "name": "drive-watch",
    "nodes": [
      {"name": "Poll", "type": trigger_type, "parameters": {"pollTimes": {"everyX": 1, "unit": "minutes"}}},
      {"name": "Collect", "type": "noOp"}
    ],
    "connections": {"Poll": {"main": [[{"node": "Collect", "index": 0}]]}}
  }))
  .expect("workflow should parse")
}

fn record(last_poll: Option<chrono::DateTime<Utc>>) -> UserAutomation {
  UserAutomation {
    id: "ua-1".to_string(),
    user_id: "u1".to_string(),
    automation_id: "a1".to_string(),
    access_token: Some("at".to_string()),
    refresh_token: Some("rt".to_string()),
    // Fresh enough that no refresh is attempted.
    token_expiry: Some(Utc::now() + ChronoDuration::hours(1)),
    is_active: false,
    parameters: json!({}),
    automation_data: AutomationData {
      last_poll_time: last_poll,
      ..AutomationData::default()
    },
    run_count: 0,
    last_run_at: None,
  }
}

struct Harness {
  supervisor: PollSupervisor,
  store: Arc<MemoryStore>,
  records: Arc<Mutex<Vec<Item>>>,
}

fn harness(trigger_type: &str) -> Harness {
  let records = Arc::new(Mutex::new(Vec::new()));
  let mut registry = ExecutorRegistry::new();
  registry.register(
    "externalPollTrigger",
    Arc::new(ExternalPollTrigger {
      records: records.clone(),
    }),
  );
  registry.register("noOp", Arc::new(NoOp));

  let store = Arc::new(MemoryStore::new());
  let supervisor = PollSupervisor::new(
    store.clone(),
    Arc::new(StaticTemplates {
      template: AutomationTemplate {
        workflow: poll_workflow(trigger_type),
        developer_keys: IndexMap::new(),
        provider: Provider::Unknown("test".to_string()),
      },
    }),
    Arc::new(Engine::new(registry)),
    Arc::new(Refresher::new(ClientConfig::default(), ClientConfig::default())),
    PollConfig::default(),
  );

  Harness {
    supervisor,
    store,
    records,
  }
}

fn file(id: &str, created: chrono::DateTime<Utc>) -> Item {
  Item::from_json(json!({"id": id, "createdTime": created.to_rfc3339()}))
}

#[tokio::test]
async fn tick_advances_cursor_and_deduplicates() {
  let h = harness("externalPollTrigger");
  let t0 = Utc::now() - ChronoDuration::hours(1);
  h.store.upsert(&record(Some(t0))).await.expect("upsert");
  {
    let mut records = h.records.lock().expect("lock");
    records.push(file("F1", Utc::now() - ChronoDuration::minutes(30)));
    records.push(file("F2", Utc::now() - ChronoDuration::minutes(20)));
  }

  let outcome = h.supervisor.tick_once("u1", "a1").await.expect("tick should run");
  assert!(outcome.success);
  assert_eq!(outcome.new_items, 2);

  let loaded = h.store.get("u1", "a1").await.expect("record");
  assert_eq!(loaded.automation_data.processed_files, ["F1", "F2"]);
  assert_eq!(loaded.automation_data.total_processed, 2);
  assert_eq!(loaded.run_count, 1);
  let first_cursor = loaded.automation_data.last_poll_time.expect("cursor should be set");
  assert!(first_cursor > t0, "cursor must advance past the seed");

  // Second tick against unchanged external state: nothing new.
  let outcome = h.supervisor.tick_once("u1", "a1").await.expect("tick should run");
  assert!(outcome.success);
  assert_eq!(outcome.new_items, 0);

  let loaded = h.store.get("u1", "a1").await.expect("record");
  assert_eq!(loaded.automation_data.processed_files, ["F1", "F2"]);
  assert_eq!(loaded.run_count, 2);
  let second_cursor = loaded.automation_data.last_poll_time.expect("cursor should be set");
  assert!(second_cursor >= first_cursor, "cursor is non-decreasing");
}

#[tokio::test]
async fn start_and_stop_lifecycle() {
  let h = harness("externalPollTrigger");
  h.store.upsert(&record(None)).await.expect("upsert");

  h.supervisor.start_polling("u1", "a1").await.expect("start should succeed");
  assert!(h.supervisor.is_polling("u1", "a1").await);
  assert!(h.store.get("u1", "a1").await.expect("record").is_active);

  h.supervisor.stop_polling("u1", "a1").await.expect("stop should succeed");
  assert!(!h.supervisor.is_polling("u1", "a1").await);
  assert!(!h.store.get("u1", "a1").await.expect("record").is_active);
}

#[tokio::test]
async fn failing_test_tick_marks_record_inactive() {
  // The template names a node type with no registered executor, so the
  // test tick aborts.
  let h = harness("unregisteredTrigger");
  let mut rec = record(None);
  rec.is_active = true;
  h.store.upsert(&rec).await.expect("upsert");

  let result = h.supervisor.start_polling("u1", "a1").await;
  assert!(result.is_err());
  assert!(!h.supervisor.is_polling("u1", "a1").await);
  assert!(!h.store.get("u1", "a1").await.expect("record").is_active);
}

#[tokio::test]
async fn stop_all_cancels_loops_but_keeps_records_active() {
  let h = harness("externalPollTrigger");
  h.store.upsert(&record(None)).await.expect("upsert");
  h.supervisor.start_polling("u1", "a1").await.expect("start should succeed");

  h.supervisor.stop_all().await;
  assert!(!h.supervisor.is_polling("u1", "a1").await);
  // Still active so startup resume reinstalls it.
  assert!(h.store.get("u1", "a1").await.expect("record").is_active);

  let resumed = h.supervisor.resume_active().await.expect("resume should succeed");
  assert_eq!(resumed, 1);
  assert!(h.supervisor.is_polling("u1", "a1").await);
  h.supervisor.stop_all().await;
}

#[tokio::test]
async fn missing_tokens_refuse_registration() {
  let h = harness("externalPollTrigger");
  let mut rec = record(None);
  rec.access_token = None;
  h.store.upsert(&rec).await.expect("upsert");

  match h.supervisor.start_polling("u1", "a1").await {
    Err(SchedulerError::MissingTokens { user_id, .. }) => assert_eq!(user_id, "u1"),
    other => panic!("expected MissingTokens, got {other:?}"),
  }
}

#[tokio::test]
async fn failed_tick_does_not_advance_cursor() {
  let h = harness("unregisteredTrigger");
  let t0 = Utc::now() - ChronoDuration::hours(1);
  h.store.upsert(&record(Some(t0))).await.expect("upsert");

  let result = h.supervisor.tick_once("u1", "a1").await;
  assert!(result.is_err());

  let loaded = h.store.get("u1", "a1").await.expect("record");
  assert_eq!(loaded.automation_data.last_poll_time, Some(t0));
  assert_eq!(loaded.run_count, 1, "failed runs still count");
}
