//! The process-wide polling registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use windlass_credential::Refresher;
use windlass_engine::Engine;
use windlass_store::Store;
use windlass_workflow::Workflow;

use crate::error::SchedulerError;
use crate::template::TemplateSource;
use crate::tick::{TickDeps, TickOutcome, run_tick};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Supervisor tuning knobs.
#[derive(Debug, Clone)]
pub struct PollConfig {
  /// Interval used when the trigger does not specify `pollTimes`.
  pub default_interval: Duration,
  /// Delay between loop installs on startup resume.
  pub resume_stagger: Duration,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      default_interval: DEFAULT_POLL_INTERVAL,
      resume_stagger: Duration::from_millis(500),
    }
  }
}

struct LoopHandle {
  cancel: CancellationToken,
  task: JoinHandle<()>,
}

struct SupervisorInner {
  store: Arc<dyn Store>,
  templates: Arc<dyn TemplateSource>,
  engine: Arc<Engine>,
  refresher: Arc<Refresher>,
  config: PollConfig,
  loops: Mutex<HashMap<(String, String), LoopHandle>>,
}

impl SupervisorInner {
  fn tick_deps(&self) -> TickDeps<'_> {
    TickDeps {
      store: self.store.as_ref(),
      engine: &self.engine,
      refresher: &self.refresher,
    }
  }
}

/// Owns every polling loop. Clone-cheap; all clones share one registry.
#[derive(Clone)]
pub struct PollSupervisor {
  inner: Arc<SupervisorInner>,
}

impl PollSupervisor {
  pub fn new(
    store: Arc<dyn Store>,
    templates: Arc<dyn TemplateSource>,
    engine: Arc<Engine>,
    refresher: Arc<Refresher>,
    config: PollConfig,
  ) -> Self {
    Self {
      inner: Arc::new(SupervisorInner {
        store,
        templates,
        engine,
        refresher,
        config,
        loops: Mutex::new(HashMap::new()),
      }),
    }
  }

  /// Register a polling loop for one (user, automation) pair.
  ///
  /// Runs one test tick first. On test failure the record is marked
  /// inactive and the error surfaces; on success the record is marked
  /// active and a timer is installed at the trigger's polling interval.
  pub async fn start_polling(
    &self,
    user_id: &str,
    automation_id: &str,
  ) -> Result<TickOutcome, SchedulerError> {
    let record = self.inner.store.get(user_id, automation_id).await?;
    if record.access_token.is_none() {
      return Err(SchedulerError::MissingTokens {
        user_id: user_id.to_string(),
        automation_id: automation_id.to_string(),
      });
    }
    let template = self.inner.templates.load(automation_id).await?;

    let outcome = match run_tick(&self.inner.tick_deps(), &record, &template).await {
      Ok(outcome) => outcome,
      Err(e) => {
        self.remove_loop(user_id, automation_id).await;
        if let Err(persist) = self.inner.store.set_active(&record.id, false).await {
          warn!(error = %persist, "deactivate_persist_failed");
        }
        return Err(e);
      }
    };

    self.inner.store.set_active(&record.id, true).await?;
    let interval = poll_interval(&template.workflow, self.inner.config.default_interval);
    self
      .install_loop(user_id, automation_id, interval, Duration::ZERO)
      .await;
    info!(user_id, automation_id, interval_secs = interval.as_secs(), "polling_started");
    Ok(outcome)
  }

  /// Cancel the loop and mark the record inactive.
  pub async fn stop_polling(&self, user_id: &str, automation_id: &str) -> Result<(), SchedulerError> {
    self.remove_loop(user_id, automation_id).await;
    let record = self.inner.store.get(user_id, automation_id).await?;
    self.inner.store.set_active(&record.id, false).await?;
    info!(user_id, automation_id, "polling_stopped");
    Ok(())
  }

  /// Cancel every loop. Records stay active so startup resume picks
  /// them back up.
  pub async fn stop_all(&self) {
    let mut loops = self.inner.loops.lock().await;
    for ((user_id, automation_id), handle) in loops.drain() {
      handle.cancel.cancel();
      handle.task.abort();
      info!(user_id = %user_id, automation_id = %automation_id, "polling_loop_canceled");
    }
  }

  /// Re-install a loop for every active record, staggered. Returns the
  /// number of loops installed.
  pub async fn resume_active(&self) -> Result<usize, SchedulerError> {
    let active = self.inner.store.list_active().await?;
    let mut installed = 0;
    for (index, record) in active.into_iter().enumerate() {
      let template = match self.inner.templates.load(&record.automation_id).await {
        Ok(template) => template,
        Err(e) => {
          warn!(
            user_id = %record.user_id,
            automation_id = %record.automation_id,
            error = %e,
            "resume_template_load_failed"
          );
          continue;
        }
      };
      let interval = poll_interval(&template.workflow, self.inner.config.default_interval);
      let stagger = self.inner.config.resume_stagger * index as u32;
      self
        .install_loop(&record.user_id, &record.automation_id, interval, stagger)
        .await;
      installed += 1;
    }
    info!(installed, "polling_resumed");
    Ok(installed)
  }

  /// Run one tick immediately, outside any timer.
  pub async fn tick_once(
    &self,
    user_id: &str,
    automation_id: &str,
  ) -> Result<TickOutcome, SchedulerError> {
    let record = self.inner.store.get(user_id, automation_id).await?;
    let template = self.inner.templates.load(automation_id).await?;
    run_tick(&self.inner.tick_deps(), &record, &template).await
  }

  /// Whether a loop is registered for the pair.
  pub async fn is_polling(&self, user_id: &str, automation_id: &str) -> bool {
    let loops = self.inner.loops.lock().await;
    loops.contains_key(&(user_id.to_string(), automation_id.to_string()))
  }

  async fn install_loop(
    &self,
    user_id: &str,
    automation_id: &str,
    interval: Duration,
    initial_delay: Duration,
  ) {
    let key = (user_id.to_string(), automation_id.to_string());
    let cancel = CancellationToken::new();
    let task = tokio::spawn(poll_loop(
      self.inner.clone(),
      key.0.clone(),
      key.1.clone(),
      interval,
      initial_delay,
      cancel.clone(),
    ));

    let mut loops = self.inner.loops.lock().await;
    if let Some(previous) = loops.insert(key, LoopHandle { cancel, task }) {
      previous.cancel.cancel();
      previous.task.abort();
    }
  }

  async fn remove_loop(&self, user_id: &str, automation_id: &str) {
    let mut loops = self.inner.loops.lock().await;
    if let Some(handle) = loops.remove(&(user_id.to_string(), automation_id.to_string())) {
      handle.cancel.cancel();
      handle.task.abort();
    }
  }
}

/// One pair's timer loop. Ticks run inline, so two ticks for the same
/// pair can never overlap; intervals that elapse while a tick is still
/// running are skipped.
async fn poll_loop(
  inner: Arc<SupervisorInner>,
  user_id: String,
  automation_id: String,
  interval: Duration,
  initial_delay: Duration,
  cancel: CancellationToken,
) {
  if !initial_delay.is_zero() {
    tokio::select! {
      _ = cancel.cancelled() => return,
      _ = tokio::time::sleep(initial_delay) => {}
    }
  }

  let mut timer = tokio::time::interval(interval);
  timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
  // interval() fires immediately; the registration tick already ran.
  timer.tick().await;

  loop {
    tokio::select! {
      _ = cancel.cancelled() => {
        return;
      }
      _ = timer.tick() => {
        let record = match inner.store.get(&user_id, &automation_id).await {
          Ok(record) => record,
          Err(e) => {
            warn!(user_id = %user_id, automation_id = %automation_id, error = %e, "tick_record_load_failed");
            continue;
          }
        };
        let template = match inner.templates.load(&automation_id).await {
          Ok(template) => template,
          Err(e) => {
            warn!(automation_id = %automation_id, error = %e, "tick_template_load_failed");
            continue;
          }
        };
        // A failed tick leaves the loop registered; the next interval
        // retries.
        if let Err(e) = run_tick(&inner.tick_deps(), &record, &template).await {
          warn!(user_id = %user_id, automation_id = %automation_id, error = %e, "tick_failed");
        }
      }
    }
  }
}

/// Polling interval from the trigger's `pollTimes` parameters
/// (`{everyX, unit}`), falling back to the supervisor default.
fn poll_interval(workflow: &Workflow, default: Duration) -> Duration {
  let Some(trigger) = workflow.nodes.iter().find(|n| n.is_trigger()) else {
    return default;
  };
  let Some(every) = trigger
    .parameters
    .get("pollTimes")
    .and_then(|p| p.get("everyX"))
    .and_then(Value::as_u64)
    .filter(|v| *v > 0)
  else {
    return default;
  };
  let unit = trigger
    .parameters
    .get("pollTimes")
    .and_then(|p| p.get("unit"))
    .and_then(Value::as_str)
    .unwrap_or("minutes");
  match unit {
    "seconds" => Duration::from_secs(every),
    "minutes" => Duration::from_secs(every * 60),
    "hours" => Duration::from_secs(every * 3_600),
    _ => default,
  }
}
