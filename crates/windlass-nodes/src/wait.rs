use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_workflow::{Item, Node};

use crate::params::{param_f64, param_str};

/// Sleeps for `amount` of `unit` (ms, seconds, minutes, hours), then
/// passes its input through.
pub struct Wait;

#[async_trait]
impl NodeExecutor for Wait {
  async fn execute(
    &self,
    node: &Node,
    input: Vec<Item>,
    _ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    let amount = param_f64(node, "amount").unwrap_or(0.0).max(0.0);
    let unit = param_str(node, "unit").unwrap_or("seconds");
    let millis = match unit {
      "ms" | "milliseconds" => amount,
      "seconds" => amount * 1_000.0,
      "minutes" => amount * 60_000.0,
      "hours" => amount * 3_600_000.0,
      other => return Err(NodeError::failure(format!("unknown wait unit '{other}'"))),
    };

    debug!(node = %node.name, millis, "wait_started");
    tokio::time::sleep(Duration::from_millis(millis as u64)).await;
    Ok(input)
  }
}
