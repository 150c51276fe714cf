//! Pass-based graph traversal.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use windlass_workflow::{Item, Node, WorkflowError, wrap_initial_data};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutorRegistry, NodeError};
use crate::result::{InvocationResult, NodeFailure};

/// Safeguard against graphs that never settle. Well-formed graphs finish
/// in far fewer passes; a run that reaches this bound is cyclic or wedged.
const MAX_PASSES: usize = 1000;

/// The workflow execution engine. Holds the executor registry; all
/// per-invocation state lives in the [`ExecutionContext`].
pub struct Engine {
  registry: Arc<ExecutorRegistry>,
}

impl Engine {
  pub fn new(registry: ExecutorRegistry) -> Self {
    Self {
      registry: Arc::new(registry),
    }
  }

  pub fn with_shared_registry(registry: Arc<ExecutorRegistry>) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &ExecutorRegistry {
    &self.registry
  }

  /// Run one invocation to completion.
  ///
  /// Each pass schedules every node whose upstream set is satisfied,
  /// gathers its main-channel input, applies empty-input propagation,
  /// and dispatches through the registry. The loop ends when a pass
  /// makes no progress; remaining executable nodes at that point are a
  /// stall.
  #[instrument(name = "engine_invoke", skip(self, ctx, cancel), fields(workflow = %ctx.workflow.name))]
  pub async fn invoke(
    &self,
    mut ctx: ExecutionContext,
    cancel: CancellationToken,
  ) -> InvocationResult {
    let execution_id = uuid::Uuid::new_v4().to_string();
    info!(execution_id = %execution_id, "workflow_started");

    let graph = match ctx.workflow.graph() {
      Ok(graph) => graph,
      Err(e) => return abort(ctx, &execution_id, e.to_string()),
    };
    if graph.entry_points().is_empty() {
      let e = EngineError::Workflow(WorkflowError::NoEntryNodes);
      return abort(ctx, &execution_id, e.to_string());
    }

    let nodes: Vec<Node> = ctx.workflow.nodes.clone();
    let entry_points: HashSet<&str> = graph.entry_points().iter().map(String::as_str).collect();

    // Sticky notes never execute; tool providers run only on demand by
    // their consumer. Both satisfy readiness without producing output.
    let excluded: HashSet<String> = nodes
      .iter()
      .filter(|n| n.is_sticky() || graph.is_tool_provider(&n.name))
      .map(|n| n.name.clone())
      .collect();

    let mut executed: HashSet<String> = HashSet::new();
    let entry_input = wrap_initial_data(&ctx.initial_data);

    let mut pass = 0;
    loop {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution_id, "workflow_canceled");
        return abort(ctx, &execution_id, EngineError::Canceled.to_string());
      }
      pass += 1;
      if pass > MAX_PASSES {
        let unexecuted = remaining(&nodes, &executed, &excluded);
        let e = EngineError::Stall { unexecuted };
        return abort(ctx, &execution_id, e.to_string());
      }

      let mut progressed = false;
      for node in &nodes {
        let key = node.name.as_str();
        if executed.contains(key) || excluded.contains(key) {
          continue;
        }
        let ready = graph
          .upstream(key)
          .iter()
          .all(|up| executed.contains(up) || excluded.contains(up));
        if !ready {
          continue;
        }

        let input = if entry_points.contains(key) {
          entry_input.clone()
        } else {
          gather_input(&ctx, key)
        };

        // Empty-input propagation: a pruned branch stays pruned.
        if input.is_empty() && !node.is_trigger() {
          debug!(execution_id = %execution_id, node = %key, "node_skipped_empty_input");
          ctx.commit_output(node, Vec::new());
          executed.insert(key.to_string());
          progressed = true;
          continue;
        }

        let Some(executor) = self.registry.get(&node.node_type) else {
          let e = EngineError::MissingExecutor {
            node: key.to_string(),
            node_type: node.node_type.clone(),
          };
          return abort(ctx, &execution_id, e.to_string());
        };

        info!(
          execution_id = %execution_id,
          node = %key,
          node_type = %node.node_type,
          input_items = input.len(),
          "node_started"
        );

        let outcome = match node.timeout_ms {
          Some(ms) => {
            match tokio::time::timeout(
              Duration::from_millis(ms),
              executor.execute(node, input, &mut ctx),
            )
            .await
            {
              Ok(result) => result,
              Err(_) => Err(NodeError::failure(format!("node timed out after {ms} ms"))),
            }
          }
          None => executor.execute(node, input, &mut ctx).await,
        };

        match outcome {
          Ok(items) => {
            info!(
              execution_id = %execution_id,
              node = %key,
              output_items = items.len(),
              "node_completed"
            );
            ctx.commit_output(node, items);
          }
          Err(e) if e.is_credential_missing() || node.on_error.continues() => {
            warn!(
              execution_id = %execution_id,
              node = %key,
              error = %e,
              "node_failed_continuing"
            );
            ctx.errors.push(NodeFailure {
              node: key.to_string(),
              message: e.message.clone(),
            });
            ctx.commit_output(node, vec![Item::from_json(json!({"error": e.message}))]);
          }
          Err(e) => {
            error!(execution_id = %execution_id, node = %key, error = %e, "node_failed");
            ctx.errors.push(NodeFailure {
              node: key.to_string(),
              message: e.message.clone(),
            });
            let abort_error = EngineError::NodeFailed {
              node: key.to_string(),
              message: e.message,
            };
            return abort(ctx, &execution_id, abort_error.to_string());
          }
        }
        executed.insert(key.to_string());
        progressed = true;
      }

      if !progressed {
        break;
      }
    }

    let unexecuted = remaining(&nodes, &executed, &excluded);
    if !unexecuted.is_empty() {
      let e = EngineError::Stall { unexecuted };
      return abort(ctx, &execution_id, e.to_string());
    }

    let success = ctx.errors.is_empty();
    info!(execution_id = %execution_id, success, passes = pass, "workflow_completed");
    InvocationResult {
      success,
      outputs: ctx.outputs,
      errors: ctx.errors,
      error: None,
    }
  }
}

/// Concatenate items from every incoming `main` edge, in the iteration
/// order of `connections`. Empty source outputs contribute nothing; the
/// slot index on the source side is not consulted (multi-output nodes
/// store a single active-branch sequence).
fn gather_input(ctx: &ExecutionContext, target: &str) -> Vec<Item> {
  let mut input = Vec::new();
  for (source, channels) in &ctx.workflow.connections {
    let Some(source_key) = ctx.workflow.canonical_key(source) else {
      continue;
    };
    for (channel, slots) in channels {
      if !channel.is_main() {
        continue;
      }
      for slot in slots {
        for record in slot {
          let resolves = ctx
            .workflow
            .canonical_key(&record.node)
            .is_some_and(|k| k == target);
          if !resolves {
            continue;
          }
          if let Some(items) = ctx.outputs.get(source_key) {
            if !items.is_empty() {
              input.extend(items.iter().cloned());
            }
          }
        }
      }
    }
  }
  input
}

fn remaining(nodes: &[Node], executed: &HashSet<String>, excluded: &HashSet<String>) -> Vec<String> {
  nodes
    .iter()
    .filter(|n| !executed.contains(&n.name) && !excluded.contains(&n.name))
    .map(|n| n.name.clone())
    .collect()
}

fn abort(ctx: ExecutionContext, execution_id: &str, message: String) -> InvocationResult {
  error!(execution_id = %execution_id, error = %message, "workflow_failed");
  InvocationResult {
    success: false,
    outputs: ctx.outputs,
    errors: ctx.errors,
    error: Some(message),
  }
}
