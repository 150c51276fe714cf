//! Per-invocation execution state.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use windlass_expression::Scope;
use windlass_workflow::{Item, Node, Workflow};

/// Everything one invocation carries: the prepared workflow, committed
/// node outputs (keyed by both name and id), accumulated failures, the
/// token bag, and scheduler-provided polling state.
///
/// Executors treat the context as read-only except for [`Self::memory`]
/// and [`Self::batch_states`]; outputs are committed by the engine after
/// the producer returns.
#[derive(Debug)]
pub struct ExecutionContext {
  pub workflow: Workflow,
  pub outputs: IndexMap<String, Vec<Item>>,
  pub errors: Vec<crate::result::NodeFailure>,
  pub tokens: IndexMap<String, String>,
  pub initial_data: Value,
  /// Lower bound of the window a polling trigger considers.
  pub polling_cursor: Option<DateTime<Utc>>,
  /// Natural keys a polling trigger has already emitted in prior ticks.
  pub processed_set: HashSet<String>,
  /// Batch iteration state, keyed by node name.
  pub batch_states: HashMap<String, BatchState>,
  /// Component-private state, keyed by node name. Persists across
  /// iterations within one execution only.
  pub memory: HashMap<String, Value>,
}

/// Iteration state of a batch-splitting node.
#[derive(Debug, Clone)]
pub struct BatchState {
  pub all_items: Vec<Item>,
  pub cursor: usize,
  pub total_batches: usize,
}

impl ExecutionContext {
  pub fn new(workflow: Workflow, initial_data: Value, tokens: IndexMap<String, String>) -> Self {
    Self {
      workflow,
      outputs: IndexMap::new(),
      errors: Vec::new(),
      tokens,
      initial_data,
      polling_cursor: None,
      processed_set: HashSet::new(),
      batch_states: HashMap::new(),
      memory: HashMap::new(),
    }
  }

  /// Seed scheduler-owned polling state.
  pub fn with_polling_state(
    mut self,
    cursor: Option<DateTime<Utc>>,
    processed: HashSet<String>,
  ) -> Self {
    self.polling_cursor = cursor;
    self.processed_set = processed;
    self
  }

  /// Expression scope over this context for a node currently holding
  /// `input`.
  pub fn scope<'a>(&'a self, input: &'a [Item]) -> Scope<'a> {
    Scope::new(&self.outputs, input, &self.tokens, &self.initial_data)
  }

  /// Commit a node's output under both its name and its id, so later
  /// references resolve by either. First commit wins; outputs are never
  /// mutated once set.
  pub(crate) fn commit_output(&mut self, node: &Node, items: Vec<Item>) {
    if !node.id.is_empty() && node.id != node.name {
      self.outputs.entry(node.id.clone()).or_insert_with(|| items.clone());
    }
    self.outputs.entry(node.name.clone()).or_insert(items);
  }
}
