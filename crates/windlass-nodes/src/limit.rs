use async_trait::async_trait;
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_workflow::{Item, Node};

use crate::params::param_u64;

/// Truncates the input to `maxItems` (default 1).
pub struct Limit;

#[async_trait]
impl NodeExecutor for Limit {
  async fn execute(
    &self,
    node: &Node,
    mut input: Vec<Item>,
    _ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    let max_items = param_u64(node, "maxItems").unwrap_or(1) as usize;
    input.truncate(max_items);
    Ok(input)
  }
}
