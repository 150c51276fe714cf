//! The `merge` transform.

use async_trait::async_trait;
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_workflow::{Item, Node};

/// Emits its input unchanged. The engine has already concatenated items
/// from every incoming edge in source order, which is exactly append
/// semantics.
pub struct Merge;

#[async_trait]
impl NodeExecutor for Merge {
  async fn execute(
    &self,
    _node: &Node,
    input: Vec<Item>,
    _ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    Ok(input)
  }
}
