//! The `splitInBatches` iteration transform.

use async_trait::async_trait;
use windlass_engine::{BatchState, ExecutionContext, NodeError, NodeExecutor};
use windlass_workflow::{Item, Node};

use crate::params::param_u64;

/// Emits one batch of its collected items per invocation.
///
/// The first call captures the full input and the batch size
/// (`batchSize`, default 10) into the context's batch state; subsequent
/// calls advance the cursor. The state entry is removed after the final
/// batch so a later series starts fresh.
pub struct SplitInBatches;

#[async_trait]
impl NodeExecutor for SplitInBatches {
  async fn execute(
    &self,
    node: &Node,
    input: Vec<Item>,
    ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    let batch_size = param_u64(node, "batchSize").unwrap_or(10).max(1) as usize;

    let state = ctx
      .batch_states
      .entry(node.name.clone())
      .or_insert_with(|| BatchState {
        total_batches: input.len().div_ceil(batch_size),
        all_items: input,
        cursor: 0,
      });

    let start = state.cursor * batch_size;
    let end = (start + batch_size).min(state.all_items.len());
    let batch = state.all_items[start..end].to_vec();
    state.cursor += 1;

    if state.cursor >= state.total_batches {
      ctx.batch_states.remove(&node.name);
    }
    Ok(batch)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use indexmap::IndexMap;
  use serde_json::json;
  use windlass_workflow::Workflow;

  fn context() -> ExecutionContext {
    let workflow: Workflow = serde_json::from_value(json!({
      "name": "t",
      "nodes": [],
      "connections": {}
    }))
    .expect("workflow should parse");
    ExecutionContext::new(workflow, json!({}), IndexMap::new())
  }

  fn batch_node() -> Node {
    serde_json::from_value(json!({
      "name": "Batch",
      "type": "splitInBatches",
      "parameters": {"batchSize": 10}
    }))
    .expect("node should parse")
  }

  #[tokio::test]
  async fn emits_batches_then_resets_state() {
    let mut ctx = context();
    let node = batch_node();
    let items: Vec<Item> = (0..25).map(|i| Item::from_json(json!({"i": i}))).collect();

    let first = SplitInBatches
      .execute(&node, items, &mut ctx)
      .await
      .expect("first batch");
    assert_eq!(first.len(), 10);
    assert_eq!(first[0].json, json!({"i": 0}));

    let second = SplitInBatches
      .execute(&node, Vec::new(), &mut ctx)
      .await
      .expect("second batch");
    assert_eq!(second.len(), 10);
    assert_eq!(second[0].json, json!({"i": 10}));

    let third = SplitInBatches
      .execute(&node, Vec::new(), &mut ctx)
      .await
      .expect("third batch");
    assert_eq!(third.len(), 5);
    assert_eq!(third[4].json, json!({"i": 24}));

    assert!(
      !ctx.batch_states.contains_key("Batch"),
      "state must reset after the final batch"
    );
  }
}
