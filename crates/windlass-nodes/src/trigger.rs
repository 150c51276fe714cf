//! Trigger executors.

use async_trait::async_trait;
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_workflow::{Item, Node};

/// Manual, schedule and webhook triggers all behave the same way inside
/// an invocation: the engine hands them the wrapped initial data and
/// they emit it as the workflow's first items.
pub struct PassthroughTrigger;

#[async_trait]
impl NodeExecutor for PassthroughTrigger {
  async fn execute(
    &self,
    _node: &Node,
    input: Vec<Item>,
    _ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    Ok(input)
  }
}
