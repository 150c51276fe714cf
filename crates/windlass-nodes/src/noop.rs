use async_trait::async_trait;
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_workflow::{Item, Node};

/// Passthrough. Items (binary included) flow through untouched.
pub struct NoOp;

#[async_trait]
impl NodeExecutor for NoOp {
  async fn execute(
    &self,
    _node: &Node,
    input: Vec<Item>,
    _ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    Ok(input)
  }
}
